use serde::{Deserialize, Serialize};

use crate::llm::Message;

const SYSTEM_PROMPT: &str = "You are a meticulous financial-analysis assistant. \
Use the available tools to gather data and compute total returns. \
Always respond with valid JSON when invoking a function. \
Never invent numbers; always cite tool output.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub ticker_a: String,
    pub ticker_b: String,
    /// Lookback window in plain words, e.g. "1 year".
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "1 year".to_string()
}

impl ComparisonRequest {
    pub fn new(ticker_a: &str, ticker_b: &str) -> Self {
        Self {
            ticker_a: ticker_a.trim().to_uppercase(),
            ticker_b: ticker_b.trim().to_uppercase(),
            period: default_period(),
        }
    }

    /// A blank period keeps the default.
    pub fn with_period(mut self, period: &str) -> Self {
        let period = period.trim();
        self.period = if period.is_empty() {
            default_period()
        } else {
            period.to_string()
        };
        self
    }

    /// The six searches, in slot order.
    pub fn queries(&self) -> [String; 6] {
        let (a, b, period) = (&self.ticker_a, &self.ticker_b, &self.period);
        [
            format!("{} stock price {} ago", a, period),
            format!("{} current stock price", a),
            format!("{} stock price {} ago", b, period),
            format!("{} current stock price", b),
            format!("{} dividends last {}", a, period),
            format!("{} dividends last {}", b, period),
        ]
    }
}

pub fn user_prompt(request: &ComparisonRequest) -> String {
    let mut prompt = format!(
        "Compare total return (price + dividends) for {} vs {} over the past {}.\n\
         Start with one search_stock_data call containing these queries, in this order:\n",
        request.ticker_a, request.ticker_b, request.period
    );
    for (idx, query) in request.queries().iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", idx + 1, query));
    }
    prompt.push_str(
        "Pass the matching roles alongside, in the same order: \
         a_initial, a_final, b_initial, b_final, a_dividend, b_dividend.\n",
    );
    prompt
}

pub fn messages(request: &ComparisonRequest) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt(request))]
}
