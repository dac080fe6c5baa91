//! Core type definitions for the StoryTree narrative model.
//!
//! All types are serializable and cheap to clone.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Attribute Addressing
// ---------------------------------------------------------------------------

/// Separator joining class and type in [`AttributeKey::vec_key`].
///
/// Never part of a valid identifier (see [`is_valid_identifier`]).
pub const KEY_SEPARATOR: char = '.';

/// Whether `name` is usable as a class or type name.
///
/// Valid names are non-empty and made of ASCII alphanumerics, `_`, `-`
/// and spaces.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
}

/// The composite (class, type) address of one characteristic slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey {
    /// Attribute class, e.g. `"mood"`.
    pub class: String,
    /// Type within the class, e.g. `"anger"`.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl AttributeKey {
    /// Create a key from a class and type name.
    #[must_use]
    pub fn new(class: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            type_name: type_name.into(),
        }
    }

    /// The single-string form of this address: `class.type`.
    #[must_use]
    pub fn vec_key(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.class, self.type_name)
    }

    /// Whether both halves of the key are valid identifiers.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_identifier(&self.class) && is_valid_identifier(&self.type_name)
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.class, self.type_name)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The two kinds of value a characteristic can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Signed integer.
    Integer,
    /// True / false.
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// A typed attribute value.
///
/// Serialized untagged, so JSON `5` and `true` map directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer payload.
    Int(i64),
    /// Boolean payload.
    Bool(bool),
}

impl Value {
    /// Which kind of value this is.
    #[must_use]
    pub fn kind(self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Integer,
            Self::Bool(_) => ValueKind::Boolean,
        }
    }

    /// The integer payload, if this is an integer.
    #[must_use]
    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(v),
            Self::Bool(_) => None,
        }
    }

    /// The boolean payload, if this is a boolean.
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(v),
            Self::Int(_) => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier of a narrative action within one character's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u32);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_key_joins_with_separator() {
        let key = AttributeKey::new("mood", "anger");
        assert_eq!(key.vec_key(), "mood.anger");
        assert_eq!(key.to_string(), key.vec_key());
    }

    #[test]
    fn identifiers_reject_separator_and_empty() {
        assert!(is_valid_identifier("trust level"));
        assert!(is_valid_identifier("hp_max-2"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a.b"));
        assert!(!AttributeKey::new("mood", "").is_valid());
    }

    #[test]
    fn value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Value::Int(7)).expect("ser"), "7");
        let v: Value = serde_json::from_str("true").expect("de");
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_str("-3").expect("de");
        assert_eq!(v.as_int(), Some(-3));
        assert_eq!(v.as_bool(), None);
    }

    #[test]
    fn attribute_key_uses_type_field_name() {
        let key: AttributeKey =
            serde_json::from_str(r#"{"class":"mood","type":"joy"}"#).expect("de");
        assert_eq!(key, AttributeKey::new("mood", "joy"));
    }
}
