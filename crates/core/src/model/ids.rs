use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PieceIdError {
    #[error("piece id must not be empty")]
    Empty,
}

/// Identifier of a piece on the backend.
///
/// Opaque to the client: it is only ever echoed back in API paths and
/// stream query strings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceId(String);

impl PieceId {
    /// Creates a new `PieceId`.
    ///
    /// # Errors
    ///
    /// Returns `PieceIdError::Empty` for blank input.
    pub fn new(id: impl Into<String>) -> Result<Self, PieceIdError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(PieceIdError::Empty);
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PieceId({})", self.0)
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PieceId {
    type Err = PieceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PieceId {
    type Error = PieceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PieceId> for String {
    fn from(id: PieceId) -> Self {
        id.0
    }
}

impl AsRef<str> for PieceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_ids() {
        assert_eq!(PieceId::new("   "), Err(PieceIdError::Empty));
        assert_eq!("".parse::<PieceId>(), Err(PieceIdError::Empty));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = PieceId::new("  abc-123 ").unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(format!("{id:?}"), "PieceId(abc-123)");
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn deserializes_from_plain_string() {
        let id: PieceId = serde_json::from_str("\"p-1\"").unwrap();
        assert_eq!(id.as_str(), "p-1");
        assert!(serde_json::from_str::<PieceId>("\"\"").is_err());
    }
}
