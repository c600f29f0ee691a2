use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("initial_price must be non-zero")]
    ZeroInitialPrice,
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

fn finite(name: &'static str, value: f64) -> Result<f64, CalcError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NonFinite(name))
    }
}

/// `(final - initial) / initial * 100`
pub fn price_return(initial_price: f64, final_price: f64) -> Result<f64, CalcError> {
    finite("initial_price", initial_price)?;
    finite("final_price", final_price)?;
    if initial_price == 0.0 {
        return Err(CalcError::ZeroInitialPrice);
    }
    finite("price_return", (final_price - initial_price) / initial_price * 100.0)
}

/// `dividend_total / initial * 100`
pub fn dividend_yield(dividend_total: f64, initial_price: f64) -> Result<f64, CalcError> {
    finite("dividend_total", dividend_total)?;
    finite("initial_price", initial_price)?;
    if initial_price == 0.0 {
        return Err(CalcError::ZeroInitialPrice);
    }
    finite("dividend_yield", dividend_total / initial_price * 100.0)
}

pub fn total_return(price_return: f64, dividend_yield: f64) -> Result<f64, CalcError> {
    finite("price_return", price_return)?;
    finite("dividend_yield", dividend_yield)?;
    finite("total_return", price_return + dividend_yield)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// `None` on an exact tie.
    pub winner: Option<String>,
    pub margin: f64,
    pub summary: String,
}

/// Ranks two total returns. Equal returns are reported as a tie rather than
/// credited to either side, so swapping the operands never changes the winner.
pub fn compare(a_name: &str, a_return: f64, b_name: &str, b_return: f64) -> Verdict {
    let diff = a_return - b_return;
    let margin = diff.abs();
    let winner = if diff > 0.0 {
        Some(a_name.to_string())
    } else if diff < 0.0 {
        Some(b_name.to_string())
    } else {
        None
    };
    let headline = match &winner {
        Some(name) => format!("{} outperformed by {:.2}%.", name, margin),
        None => format!("{} and {} tied.", a_name, b_name),
    };
    let summary = format!(
        "{} Total returns were: {} = {:.2}%, {} = {:.2}%.",
        headline, a_name, a_return, b_name, b_return
    );
    Verdict {
        winner,
        margin,
        summary,
    }
}
