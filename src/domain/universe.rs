//! Instrument universe for momentum ranking.
//!
//! Parses code lists from configuration into an ordered, de-duplicated set.

use std::collections::HashSet;

/// Universe used when the configuration names no codes.
pub const DEFAULT_CODES: &str = "AAPL,MSFT,GOOGL,AMZN,NVDA,META";

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub codes: Vec<String>,
}

impl Universe {
    pub fn parse(input: &str) -> Result<Self, UniverseError> {
        let codes = parse_codes(input)?;
        Ok(Universe { codes })
    }

    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty code list")]
    Empty,

    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_basic() {
        let result = parse_codes("AAPL,MSFT,GOOGL,AMZN").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOGL", "AMZN"]);
    }

    #[test]
    fn test_parse_codes_with_whitespace() {
        let result = parse_codes("  AAPL , MSFT ,NVDA,  META  ").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA", "META"]);
    }

    #[test]
    fn test_parse_codes_uppercase() {
        let result = parse_codes("aapl,msft").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_parse_codes_empty_input() {
        assert_eq!(parse_codes("   "), Err(UniverseError::Empty));
    }

    #[test]
    fn test_parse_codes_empty_token() {
        let result = parse_codes("AAPL,,MSFT");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_codes_duplicate() {
        let result = parse_codes("AAPL,MSFT,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateCode(s)) if s == "AAPL"));
    }

    #[test]
    fn test_default_universe() {
        let universe = Universe::parse(DEFAULT_CODES).unwrap();
        assert_eq!(universe.count(), 6);
        assert_eq!(universe.codes[4], "NVDA");
    }
}
