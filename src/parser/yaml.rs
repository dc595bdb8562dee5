//! YAML parsing
//!
//! Thin boundary around `serde_yaml`: the rewritten text goes in, a generic
//! `serde_yaml::Value` tree comes out. Parser failures are turned into
//! [`LoadError::Parse`] with the position pulled out of the message.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::LoadError;

lazy_static! {
    static ref POSITION_RE: Regex = Regex::new(r"at line (\d+) column (\d+)").unwrap();
    static ref POSITION_SUFFIX_RE: Regex = Regex::new(r"\s+at line \d+ column \d+$").unwrap();
}

/// Parse rewritten text into a YAML value.
///
/// An empty or comment-only document parses as `Null`.
pub fn parse_yaml(text: &str) -> Result<serde_yaml::Value, LoadError> {
    serde_yaml::from_str::<serde_yaml::Value>(text).map_err(|err| {
        let message = err.to_string();
        let (line, column) = extract_error_position(&message);

        tracing::debug!(line, column, "YAML parse failed: {}", message);

        LoadError::Parse {
            message: clean_error_message(&message),
            line,
            column,
        }
    })
}

/// Extract line and column from a serde_yaml error message
///
/// serde_yaml errors often look like: "... at line 5 column 10". Positions
/// are 1-based; `(0, 0)` means the message carried none.
fn extract_error_position(message: &str) -> (u32, u32) {
    match POSITION_RE.captures(message) {
        Some(caps) => {
            let line = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let column = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            (line, column)
        }
        None => (0, 0),
    }
}

/// Remove the trailing "at line X column Y" from a parser message
fn clean_error_message(message: &str) -> String {
    POSITION_SUFFIX_RE.replace(message, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_valid_yaml() {
        let value = parse_yaml("key: value\nlist:\n  - item1\n  - item2").unwrap();
        assert_eq!(value["key"].as_str(), Some("value"));
        assert_eq!(value["list"][1].as_str(), Some("item2"));
    }

    #[test]
    fn test_parse_invalid_yaml_indentation() {
        let result = parse_yaml("key: value\n  bad: indentation");
        assert_matches!(result, Err(LoadError::Parse { line, .. }) if line == 2);
    }

    #[test]
    fn test_parse_invalid_yaml_unclosed_quote() {
        assert_matches!(parse_yaml("key: \"unclosed"), Err(LoadError::Parse { .. }));
    }

    #[test]
    fn test_parse_empty_yaml() {
        assert_eq!(parse_yaml("").unwrap(), serde_yaml::Value::Null);
    }

    #[test]
    fn test_parse_yaml_comment_only() {
        assert_eq!(
            parse_yaml("# This is a comment\n# Another comment").unwrap(),
            serde_yaml::Value::Null
        );
    }

    #[test]
    fn test_parse_folded_block_scalar() {
        let value = parse_yaml("f: >\n  first\n  second\n").unwrap();
        assert_eq!(value["f"].as_str(), Some("first second\n"));
    }

    #[test]
    fn test_extract_error_position() {
        assert_eq!(extract_error_position("error at line 5 column 10"), (5, 10));
        assert_eq!(
            extract_error_position("some error without position"),
            (0, 0)
        );
        assert_eq!(
            extract_error_position("mapping values at line 10 column 25"),
            (10, 25)
        );
    }

    #[test]
    fn test_clean_error_message() {
        assert_eq!(
            clean_error_message("invalid YAML at line 5 column 10"),
            "invalid YAML"
        );
        assert_eq!(
            clean_error_message("some error without position"),
            "some error without position"
        );
    }
}
