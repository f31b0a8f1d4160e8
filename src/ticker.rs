use chrono::NaiveDate;
use std::collections::HashSet;

use crate::error::InputError;

/// Split a comma-separated string into trimmed, upper-cased tokens.
/// Empty tokens are dropped; duplicates are kept.
fn tokenize(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Normalize raw ticker input: trim, upper-case, drop empty tokens and
/// remove duplicates while keeping first-occurrence order.
pub fn clean_ticker_input(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(input)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Tickers that appear more than once after case folding, in the order their
/// second occurrence is met.
pub fn find_duplicates(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for token in tokenize(input) {
        if !seen.insert(token.clone()) && reported.insert(token.clone()) {
            duplicates.push(token);
        }
    }

    duplicates
}

/// Validate user input and return the ticker list for an action.
///
/// Duplicates are rejected rather than silently collapsed, so the check runs
/// on the token list before `clean_ticker_input` removes them.
pub fn validate_tickers(input: &str) -> Result<Vec<String>, InputError> {
    if input.trim().is_empty() {
        return Err(InputError::EmptyTickers);
    }

    let duplicates = find_duplicates(input);
    if !duplicates.is_empty() {
        return Err(InputError::DuplicateTickers(duplicates));
    }

    let tickers = clean_ticker_input(input);
    if tickers.is_empty() {
        return Err(InputError::EmptyTickers);
    }

    Ok(tickers)
}

/// The end date may equal the start date but never precede it.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), InputError> {
    if end < start {
        return Err(InputError::InvalidDateRange { start, end });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ticker_input_mixed() {
        let tickers = clean_ticker_input(" aapl, MSFT ,aapl,, googl");
        assert_eq!(tickers, vec!["AAPL", "MSFT", "GOOGL"]);
    }

    #[test]
    fn test_clean_ticker_input_case_folded_duplicates() {
        assert_eq!(clean_ticker_input("aapl,AAPL"), vec!["AAPL"]);
    }

    #[test]
    fn test_clean_ticker_input_empty() {
        assert!(clean_ticker_input("").is_empty());
        assert!(clean_ticker_input("   ").is_empty());
        assert!(clean_ticker_input(", ,,").is_empty());
    }

    #[test]
    fn test_clean_ticker_input_invariants() {
        let inputs = [
            "a,b,c",
            "  x , , y,X,z,, ",
            "brk.b, BRK.B ,spy",
            ",,,",
            "one",
        ];
        for input in inputs {
            let tickers = clean_ticker_input(input);
            let unique: HashSet<_> = tickers.iter().collect();
            assert_eq!(unique.len(), tickers.len(), "duplicates in {:?}", input);
            for t in &tickers {
                assert!(!t.is_empty());
                assert_eq!(t, &t.to_uppercase());
                assert_eq!(t, t.trim());
            }
        }
    }

    #[test]
    fn test_validate_tickers_ok() {
        let tickers = validate_tickers("spy, qqq").unwrap();
        assert_eq!(tickers, vec!["SPY", "QQQ"]);
    }

    #[test]
    fn test_validate_tickers_blank() {
        assert_eq!(validate_tickers("   "), Err(InputError::EmptyTickers));
        assert_eq!(validate_tickers(""), Err(InputError::EmptyTickers));
    }

    #[test]
    fn test_validate_tickers_only_commas() {
        assert_eq!(validate_tickers(" , ,"), Err(InputError::EmptyTickers));
    }

    #[test]
    fn test_validate_tickers_rejects_duplicates() {
        assert_eq!(
            validate_tickers("aapl,AAPL"),
            Err(InputError::DuplicateTickers(vec!["AAPL".to_string()]))
        );
        assert_eq!(
            validate_tickers("msft, aapl, spy, Aapl, msft, MSFT"),
            Err(InputError::DuplicateTickers(vec![
                "AAPL".to_string(),
                "MSFT".to_string()
            ]))
        );
    }

    #[test]
    fn test_validate_date_range() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert!(validate_date_range(start, end).is_ok());
        assert!(validate_date_range(start, start).is_ok());
        assert_eq!(
            validate_date_range(end, start),
            Err(InputError::InvalidDateRange { start: end, end: start })
        );
    }
}
