//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Server-assigned notification identifier.
///
/// Opaque to the client; never reused by the server. The only structural
/// rule enforced here is that it is non-empty and safe to splice into a
/// REST path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotificationId(String);

impl NotificationId {
    /// Creates a new NotificationId, returning error if empty or not path-safe.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("notification_id"));
        }
        if id.contains('/') || id.contains('?') || id.contains('#') {
            return Err(ValidationError::invalid_format(
                "notification_id",
                "must not contain '/', '?' or '#'",
            ));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NotificationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NotificationId> for String {
    fn from(id: NotificationId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_id_accepts_object_id() {
        let id = NotificationId::new("66f1c0ffee0123456789abcd").unwrap();
        assert_eq!(id.as_str(), "66f1c0ffee0123456789abcd");
    }

    #[test]
    fn notification_id_rejects_empty() {
        assert!(NotificationId::new("").is_err());
        assert!(NotificationId::new("   ").is_err());
    }

    #[test]
    fn notification_id_rejects_path_separators() {
        assert!(NotificationId::new("a/b").is_err());
        assert!(NotificationId::new("a?b").is_err());
    }

    #[test]
    fn notification_id_deserializes_through_validation() {
        let id: NotificationId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.to_string(), "abc");

        let result: Result<NotificationId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn notification_id_serializes_as_plain_string() {
        let id = NotificationId::new("n-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"n-1\"");
    }
}
