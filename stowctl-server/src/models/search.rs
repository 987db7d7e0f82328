//! Full-text search query construction
//!
//! User input is never passed to FTS5 verbatim. Each whitespace-separated
//! term becomes a quoted FTS5 string, so operator words (`AND`, `NEAR`) and
//! punctuation are matched literally, and the final term is made a prefix
//! match so partially typed words still find their items.

use super::ValidationError;

/// Maximum length of the raw query text
const MAX_QUERY_LEN: usize = 256;

/// A validated FTS5 MATCH expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Build a MATCH expression from free text.
    ///
    /// # Example
    /// ```
    /// use stowctl_server::models::SearchQuery;
    ///
    /// let q = SearchQuery::new("Red Box").unwrap();
    /// assert_eq!(q.as_str(), r#""red" "box"*"#);
    /// assert!(SearchQuery::new("   ").is_err());
    /// ```
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "query" });
        }

        if trimmed.chars().count() > MAX_QUERY_LEN {
            return Err(ValidationError::TooLong {
                field: "query",
                max: MAX_QUERY_LEN,
            });
        }

        let lowered = trimmed.to_lowercase();
        let mut expr = lowered
            .split_whitespace()
            .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" ");
        expr.push('*');

        Ok(Self(expr))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
