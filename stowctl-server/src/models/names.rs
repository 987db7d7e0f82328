//! Item and tag name validation
//!
//! Names are trimmed before they are checked; the trimmed form is what gets
//! stored.

use super::ValidationError;

/// Maximum length for item names
const MAX_ITEM_NAME_LEN: usize = 256;

/// Maximum length for tag names
const MAX_TAG_NAME_LEN: usize = 64;

fn validated(s: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(trimmed.to_owned())
}

/// Validated item name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemName(String);

impl ItemName {
    /// Create a new item name.
    ///
    /// # Rules
    /// - Non-empty (after trimming whitespace)
    /// - Max 256 characters
    ///
    /// # Example
    /// ```
    /// use stowctl_server::models::ItemName;
    ///
    /// assert!(ItemName::new("Toolbox").is_ok());
    /// assert!(ItemName::new("").is_err());
    /// assert!(ItemName::new("   ").is_err());  // whitespace only
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        validated(s, "name", MAX_ITEM_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ItemName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated tag name. Duplicates are allowed; only shape is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName(String);

impl TagName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        validated(s, "tag_name", MAX_TAG_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_item_name() {
        let name = ItemName::new("  drill bits ").unwrap();
        assert_eq!(name.as_str(), "drill bits");
    }

    #[test]
    fn rejects_blank_item_name() {
        let err = ItemName::new(" \t\n").unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }

    #[test]
    fn item_name_max_length() {
        assert!(ItemName::new(&"a".repeat(256)).is_ok());

        let err = ItemName::new(&"a".repeat(257)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 256, .. }));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 256 two-byte characters
        assert!(ItemName::new(&"ä".repeat(256)).is_ok());
    }

    #[test]
    fn tag_name_rules() {
        assert!(TagName::new("garage").is_ok());
        assert!(matches!(
            TagName::new("").unwrap_err(),
            ValidationError::Empty { field: "tag_name" }
        ));
        assert!(matches!(
            TagName::new(&"t".repeat(65)).unwrap_err(),
            ValidationError::TooLong { max: 64, .. }
        ));
    }
}
