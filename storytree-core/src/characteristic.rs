//! Characteristic: one typed attribute of a character.
//!
//! A characteristic lives at a fixed [`AttributeKey`] and never changes
//! kind. Integer characteristics may carry [`Bounds`]; every write is
//! clamped into them, the way the schema's `min`/`max` cap a class.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryError};
use crate::expression::Operation;
use crate::types::{AttributeKey, Value, ValueKind};

/// Inclusive integer range for a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lowest storable value.
    pub min: i64,
    /// Highest storable value.
    pub max: i64,
}

impl Bounds {
    /// Create bounds, swapping the ends if given in reverse.
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Clamp `value` into the range.
    #[must_use]
    pub fn clamp(self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }

    /// Whether `value` lies inside the range.
    #[must_use]
    pub fn contains(self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// A single named, typed attribute belonging to a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    key: AttributeKey,
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<Bounds>,
}

impl Characteristic {
    /// An unbounded integer characteristic.
    #[must_use]
    pub fn integer(key: AttributeKey, value: i64) -> Self {
        Self {
            key,
            value: Value::Int(value),
            bounds: None,
        }
    }

    /// A boolean characteristic.
    #[must_use]
    pub fn boolean(key: AttributeKey, value: bool) -> Self {
        Self {
            key,
            value: Value::Bool(value),
            bounds: None,
        }
    }

    /// Restrict an integer characteristic to `[min, max]`, clamping the
    /// current value. Has no effect on booleans.
    #[must_use]
    pub fn with_bounds(mut self, min: i64, max: i64) -> Self {
        if let Value::Int(v) = self.value {
            let bounds = Bounds::new(min, max);
            self.value = Value::Int(bounds.clamp(v));
            self.bounds = Some(bounds);
        }
        self
    }

    /// The (class, type) address.
    #[must_use]
    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> Value {
        self.value
    }

    /// Integer or boolean.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Integer range, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Overwrite the value, clamping integers into bounds.
    ///
    /// Returns the value actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::TypeMismatch`] if `value` is of a different
    /// kind; the stored value is left untouched.
    pub fn set(&mut self, value: Value) -> Result<Value> {
        if value.kind() != self.kind() {
            return Err(StoryError::TypeMismatch {
                key: self.key.clone(),
                operation: Operation::Assign,
                expected: self.kind(),
                found: value.kind(),
            });
        }
        self.value = match (value, self.bounds) {
            (Value::Int(v), Some(bounds)) => Value::Int(bounds.clamp(v)),
            _ => value,
        };
        Ok(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AttributeKey {
        AttributeKey::new("stats", "health")
    }

    #[test]
    fn bounds_clamp_on_construction_and_write() {
        let mut c = Characteristic::integer(key(), 150).with_bounds(0, 100);
        assert_eq!(c.value(), Value::Int(100));
        assert_eq!(c.set(Value::Int(-5)).expect("set"), Value::Int(0));
        assert_eq!(c.set(Value::Int(42)).expect("set"), Value::Int(42));
    }

    #[test]
    fn reversed_bounds_are_normalized() {
        let b = Bounds::new(10, -10);
        assert_eq!((b.min, b.max), (-10, 10));
        assert!(b.contains(0));
        assert!(!b.contains(11));
    }

    #[test]
    fn set_rejects_other_kind() {
        let mut c = Characteristic::boolean(key(), false);
        let err = c.set(Value::Int(1));
        assert!(matches!(err, Err(StoryError::TypeMismatch { .. })));
        assert_eq!(c.value(), Value::Bool(false));
    }

    #[test]
    fn bounds_ignored_for_booleans() {
        let c = Characteristic::boolean(key(), true).with_bounds(0, 1);
        assert_eq!(c.bounds(), None);
        assert_eq!(c.kind(), ValueKind::Boolean);
    }
}
