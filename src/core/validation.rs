//! Validation for file names stored in the directory index
//!
//! Names are flat (there are no directories), so the rules are simple:
//! - Non-empty
//! - At most `max_len` bytes
//! - No `/` and no control characters
//!
//! Case is preserved as given; the directory index compares names
//! case-insensitively.

use crate::error::{ImffsError, Result};
use regex::Regex;

/// A validated file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    /// Anything except path separators and control characters
    const PATTERN: &'static str = r"^[^/\x00-\x1f\x7f]+$";

    /// Create a new validated name
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the name doesn't meet validation rules.
    ///
    /// # Examples
    ///
    /// ```
    /// use imffs::core::validation::FileName;
    ///
    /// let name = FileName::new("notes.txt", 255).unwrap();
    /// assert_eq!(name.as_str(), "notes.txt");
    ///
    /// assert!(FileName::new("", 255).is_err());
    /// assert!(FileName::new("dir/file", 255).is_err());
    /// ```
    pub fn new(name: impl Into<String>, max_len: usize) -> Result<Self> {
        let name = name.into();
        Self::validate_name(&name, max_len)?;
        Ok(FileName(name))
    }

    fn validate_name(name: &str, max_len: usize) -> Result<()> {
        if name.is_empty() {
            return Err(ImffsError::InvalidName("name cannot be empty".to_string()));
        }

        if name.len() > max_len {
            return Err(ImffsError::InvalidName(format!(
                "name too long (max {} bytes)",
                max_len
            )));
        }

        let re = Regex::new(Self::PATTERN).map_err(|e| ImffsError::InvalidName(e.to_string()))?;
        if !re.is_match(name) {
            return Err(ImffsError::InvalidName(format!(
                "name {:?} must not contain '/' or control characters",
                name
            )));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(FileName::new("a", 255).is_ok());
        assert!(FileName::new("README.md", 255).is_ok());
        assert!(FileName::new("with spaces and-dashes_1", 255).is_ok());
        assert!(FileName::new("ünïcödé", 255).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(FileName::new("", 255).is_err());
        assert!(FileName::new("a/b", 255).is_err());
        assert!(FileName::new("tab\there", 255).is_err());
        assert!(FileName::new("nul\0", 255).is_err());
    }

    #[test]
    fn test_max_len() {
        assert!(FileName::new("abcd", 4).is_ok());
        let result = FileName::new("abcde", 4);
        assert!(matches!(result, Err(ImffsError::InvalidName(_))));
    }
}
