use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid id {value:?}: ids used in lookups must be a single non-empty path segment")]
pub struct IdError {
    value: String,
}

/// Identifier of a source record or a client, as assigned by the data store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Id of the synthetic deposit entry emitted alongside a repair.
    pub fn deposit_of(repair_id: &Id) -> Self {
        Self(format!("{}-deposit", repair_id.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the id as a URL path segment, rejecting values that would
    /// escape the segment (`/`, `\`, `?`, `#`, NUL, `.` and `..`).
    pub fn as_path_segment(&self) -> Result<&str, IdError> {
        let value = self.0.as_str();
        let unsafe_char = value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '\0'));
        if value.trim().is_empty() || value == "." || value == ".." || unsafe_char {
            return Err(IdError {
                value: value.to_string(),
            });
        }
        Ok(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
