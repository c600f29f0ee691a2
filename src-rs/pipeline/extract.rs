use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DOLLAR_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([0-9]+(?:\.[0-9]{1,2})?)").expect("dollar amount pattern")
});

/// Reduces a search payload to the first dollar amount found in its snippets.
///
/// Snippets of `organic_results` are joined in order and scanned once; the
/// first `$<digits>[.<1-2 digits>]` match wins. This is a best-effort
/// heuristic: it does not know which of several amounts is the right one,
/// and thousands separators cut the number short (`$1,234` reads as `1`).
/// Error payloads, missing fields and amounts too large for an `f64`
/// yield `None`.
pub fn extract(payload: &Value) -> Option<f64> {
    let snippets: Vec<&str> = payload
        .get("organic_results")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("snippet").and_then(|v| v.as_str()))
                .collect()
        })
        .unwrap_or_default();

    let text = snippets.join(" ");
    let caps = DOLLAR_AMOUNT.captures(&text)?;
    caps.get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_dollar_amount_in_snippet() {
        let payload = json!({"organic_results": [{"snippet": "price rose to $123.45 yesterday"}]});
        assert_eq!(extract(&payload), Some(123.45));
    }

    #[test]
    fn no_organic_results_is_absent() {
        assert_eq!(extract(&json!({"organic_results": []})), None);
        assert_eq!(extract(&json!({})), None);
        assert_eq!(extract(&json!({"error": "timeout"})), None);
    }

    #[test]
    fn earlier_entries_win_and_snippetless_entries_are_skipped() {
        let payload = json!({"organic_results": [
            {"title": "Apple Inc. (AAPL)"},
            {"snippet": "No prices here."},
            {"snippet": "Closed at $187.2, after $190 open"},
            {"snippet": "Dividend of $0.25"}
        ]});
        assert_eq!(extract(&payload), Some(187.2));
    }

    #[test]
    fn fraction_is_capped_at_two_digits() {
        let payload = json!({"organic_results": [{"snippet": "quoted at $98.765"}]});
        assert_eq!(extract(&payload), Some(98.76));
    }

    #[test]
    fn thousands_separator_truncates() {
        let payload = json!({"organic_results": [{"snippet": "market cap $2,950 billion"}]});
        assert_eq!(extract(&payload), Some(2.0));
    }

    #[test]
    fn bare_numbers_are_not_amounts() {
        let payload = json!({"organic_results": [{"snippet": "up 12.5 percent to 150"}]});
        assert_eq!(extract(&payload), None);
    }

    #[test]
    fn non_string_snippet_is_ignored() {
        let payload = json!({"organic_results": [{"snippet": 42}, {"snippet": "$7"}]});
        assert_eq!(extract(&payload), Some(7.0));
    }

    #[test]
    fn overflowing_amount_is_absent() {
        let snippet = format!("${}", "9".repeat(400));
        let payload = json!({"organic_results": [{"snippet": snippet}]});
        assert_eq!(extract(&payload), None);
    }
}
