//! Typed conditions and facts about one characteristic.
//!
//! An [`Expression`] says "character C's attribute (class, type) relates
//! to value V via operation O". The payload is a [`Condition`], a tagged
//! variant over integer and boolean forms, so an integer expression can
//! never be read as a boolean one.
//!
//! Integer conditions compare against a live attribute value they do not
//! hold themselves. [`Expression::with_snapshot`] captures that value,
//! after which [`Expression::boolean`] is self-contained.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoryError};
use crate::types::{AttributeKey, Value, ValueKind};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The closed set of operators a script may apply to a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Store the payload.
    #[serde(rename = "=", alias = "set")]
    Assign,
    /// Add the payload (integers only).
    #[serde(rename = "+=", alias = "+")]
    Increment,
    /// Subtract the payload (integers only).
    #[serde(rename = "-=", alias = "-")]
    Decrement,
    /// Current value equals the payload.
    #[serde(rename = "==")]
    Equal,
    /// Current value differs from the payload.
    #[serde(rename = "!=")]
    NotEqual,
    /// Current value is greater (integers only).
    #[serde(rename = ">")]
    Greater,
    /// Current value is less (integers only).
    #[serde(rename = "<")]
    Less,
    /// Current value is greater or equal (integers only).
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// Current value is less or equal (integers only).
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Operation {
    /// The canonical script token.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Increment => "+=",
            Self::Decrement => "-=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }

    /// Whether applying this operation changes the stored value.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Assign | Self::Increment | Self::Decrement)
    }

    /// Whether this operation only tests the stored value.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        !self.is_mutation()
    }

    /// Whether this operation is defined for attributes of `kind`.
    ///
    /// Booleans support assignment and (in)equality only.
    #[must_use]
    pub fn supports(self, kind: ValueKind) -> bool {
        match kind {
            ValueKind::Integer => true,
            ValueKind::Boolean => matches!(self, Self::Assign | Self::Equal | Self::NotEqual),
        }
    }

    /// Compare `current` against `target`.
    ///
    /// Mutations are treated as satisfied: assignment holds when the
    /// value already equals the target, deltas always apply.
    fn compare(self, current: Value, target: Value) -> Option<bool> {
        match (current, target) {
            (Value::Int(c), Value::Int(t)) => Some(match self {
                Self::Assign | Self::Equal => c == t,
                Self::NotEqual => c != t,
                Self::Greater => c > t,
                Self::Less => c < t,
                Self::GreaterOrEqual => c >= t,
                Self::LessOrEqual => c <= t,
                Self::Increment | Self::Decrement => true,
            }),
            (Value::Bool(c), Value::Bool(t)) => match self {
                Self::Assign | Self::Equal => Some(c == t),
                Self::NotEqual => Some(c != t),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Operation {
    type Err = StoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" | "set" => Ok(Self::Assign),
            "+=" | "+" => Ok(Self::Increment),
            "-=" | "-" => Ok(Self::Decrement),
            "==" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            ">" => Ok(Self::Greater),
            "<" => Ok(Self::Less),
            ">=" => Ok(Self::GreaterOrEqual),
            "<=" => Ok(Self::LessOrEqual),
            other => Err(StoryError::UnknownOperation(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// The typed payload of an [`Expression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Condition {
    /// An integer-valued condition or effect.
    Integer {
        /// Operator applied to the attribute.
        operation: Operation,
        /// Literal right-hand side.
        value: i64,
    },
    /// A boolean-valued condition or fact.
    Boolean {
        /// Operator applied to the attribute.
        operation: Operation,
        /// Literal right-hand side.
        value: bool,
    },
}

impl Condition {
    /// The operator of either variant.
    #[must_use]
    pub fn operation(self) -> Operation {
        match self {
            Self::Integer { operation, .. } | Self::Boolean { operation, .. } => operation,
        }
    }

    /// The payload as an untyped [`Value`].
    #[must_use]
    pub fn value(self) -> Value {
        match self {
            Self::Integer { value, .. } => Value::Int(value),
            Self::Boolean { value, .. } => Value::Bool(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Expression
// ---------------------------------------------------------------------------

/// One typed condition or fact about a character's attribute.
///
/// Expressions are immutable and short-lived: built per script event,
/// resolved, applied and dropped. They name their character by value and
/// never borrow the [`Character`](crate::Character) itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    character: String,
    key: AttributeKey,
    condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot: Option<Value>,
}

impl Default for Expression {
    /// A placeholder with an empty address. Only meaningful once replaced.
    fn default() -> Self {
        Self {
            character: String::new(),
            key: AttributeKey::new("", ""),
            condition: Condition::Boolean {
                operation: Operation::Assign,
                value: false,
            },
            snapshot: None,
        }
    }
}

impl Expression {
    /// Build an expression, picking the variant from the payload's kind.
    #[must_use]
    pub fn new(
        character: impl Into<String>,
        key: AttributeKey,
        operation: Operation,
        value: Value,
    ) -> Self {
        let condition = match value {
            Value::Int(value) => Condition::Integer { operation, value },
            Value::Bool(value) => Condition::Boolean { operation, value },
        };
        Self {
            character: character.into(),
            key,
            condition,
            snapshot: None,
        }
    }

    /// An integer condition or effect.
    #[must_use]
    pub fn integer(
        character: impl Into<String>,
        key: AttributeKey,
        operation: Operation,
        value: i64,
    ) -> Self {
        Self::new(character, key, operation, Value::Int(value))
    }

    /// A boolean fact: "attribute is `value`". The operation is
    /// [`Operation::Assign`].
    #[must_use]
    pub fn fact(character: impl Into<String>, key: AttributeKey, value: bool) -> Self {
        Self::new(character, key, Operation::Assign, Value::Bool(value))
    }

    /// Copy of this expression resolved against the live value `current`.
    #[must_use]
    pub fn with_snapshot(&self, current: Value) -> Self {
        Self {
            snapshot: Some(current),
            ..self.clone()
        }
    }

    /// Whether this condition currently holds.
    ///
    /// A boolean fact is its own truth value. Anything else compares the
    /// captured snapshot against the payload using the operation.
    ///
    /// # Errors
    ///
    /// - [`StoryError::UnresolvedExpression`] if a comparison (or any
    ///   integer expression) has no snapshot yet.
    /// - [`StoryError::TypeMismatch`] if the snapshot's kind differs from
    ///   the payload's, or the operation is undefined for booleans.
    pub fn boolean(&self) -> Result<bool> {
        if let (Condition::Boolean { operation: Operation::Assign, value }, None) =
            (self.condition, self.snapshot)
        {
            return Ok(value);
        }
        let current = self.snapshot.ok_or_else(|| StoryError::UnresolvedExpression {
            key: self.key.clone(),
        })?;
        let target = self.condition.value();
        self.condition
            .operation()
            .compare(current, target)
            .ok_or_else(|| self.mismatch(current.kind()))
    }

    /// The value a mutation would store given the live value `current`.
    ///
    /// Comparisons leave the value unchanged. Integer deltas saturate.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::TypeMismatch`] if `current` is of a different
    /// kind than the payload or the operation is undefined for it.
    pub fn evaluate(&self, current: Value) -> Result<Value> {
        let operation = self.condition.operation();
        if current.kind() != self.condition.value().kind() || !operation.supports(current.kind()) {
            return Err(self.mismatch(current.kind()));
        }
        Ok(match (operation, current, self.condition) {
            (Operation::Assign, _, c) => c.value(),
            (Operation::Increment, Value::Int(cur), Condition::Integer { value, .. }) => {
                Value::Int(cur.saturating_add(value))
            }
            (Operation::Decrement, Value::Int(cur), Condition::Integer { value, .. }) => {
                Value::Int(cur.saturating_sub(value))
            }
            _ => current,
        })
    }

    /// Error for a payload that does not fit an attribute of kind `attribute`.
    fn mismatch(&self, attribute: ValueKind) -> StoryError {
        let payload = self.condition.value().kind();
        // Same kinds means the operator itself is integer-only.
        let (expected, found) = if attribute == payload {
            (ValueKind::Integer, attribute)
        } else {
            (attribute, payload)
        };
        StoryError::TypeMismatch {
            key: self.key.clone(),
            operation: self.condition.operation(),
            expected,
            found,
        }
    }

    /// Name of the character this expression concerns.
    #[must_use]
    pub fn character(&self) -> &str {
        &self.character
    }

    /// The (class, type) address.
    #[must_use]
    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    /// The address as a single string, see [`AttributeKey::vec_key`].
    #[must_use]
    pub fn vec_key(&self) -> String {
        self.key.vec_key()
    }

    /// The operator.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.condition.operation()
    }

    /// The typed payload.
    #[must_use]
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// The payload as a [`Value`].
    #[must_use]
    pub fn value(&self) -> Value {
        self.condition.value()
    }

    /// `true` for the boolean variant.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self.condition, Condition::Boolean { .. })
    }

    /// The integer payload; `None` on a boolean expression.
    #[must_use]
    pub fn int_value(&self) -> Option<i64> {
        match self.condition {
            Condition::Integer { value, .. } => Some(value),
            Condition::Boolean { .. } => None,
        }
    }

    /// The boolean payload; `None` on an integer expression.
    #[must_use]
    pub fn bool_value(&self) -> Option<bool> {
        match self.condition {
            Condition::Boolean { value, .. } => Some(value),
            Condition::Integer { .. } => None,
        }
    }

    /// Live value captured by [`with_snapshot`](Self::with_snapshot).
    #[must_use]
    pub fn snapshot(&self) -> Option<Value> {
        self.snapshot
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {}",
            self.character,
            self.key,
            self.operation(),
            self.value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AttributeKey {
        AttributeKey::new("mood", "anger")
    }

    #[test]
    fn integer_form_exposes_only_int_payload() {
        let e = Expression::integer("Ada", key(), Operation::Greater, 3);
        assert!(!e.is_boolean());
        assert_eq!(e.int_value(), Some(3));
        assert_eq!(e.bool_value(), None);
        assert_eq!(e.vec_key(), "mood.anger");
        assert_eq!(e.operation(), Operation::Greater);
    }

    #[test]
    fn boolean_fact_is_its_own_truth() {
        let e = Expression::fact("Ada", key(), true);
        assert!(e.is_boolean());
        assert_eq!(e.operation(), Operation::Assign);
        assert!(e.boolean().expect("fact"));
        assert_eq!(e.int_value(), None);
    }

    #[test]
    fn unresolved_integer_condition_errors() {
        let e = Expression::integer("Ada", key(), Operation::Less, 3);
        assert!(matches!(e.boolean(), Err(StoryError::UnresolvedExpression { .. })));
    }

    #[test]
    fn resolved_comparisons() {
        let e = Expression::integer("Ada", key(), Operation::GreaterOrEqual, 3);
        assert!(e.with_snapshot(Value::Int(3)).boolean().expect("resolved"));
        assert!(!e.with_snapshot(Value::Int(2)).boolean().expect("resolved"));

        let eq = Expression::new("Ada", key(), Operation::Equal, Value::Bool(true));
        assert!(!eq.with_snapshot(Value::Bool(false)).boolean().expect("resolved"));
        let ne = Expression::new("Ada", key(), Operation::NotEqual, Value::Bool(true));
        assert!(ne.with_snapshot(Value::Bool(false)).boolean().expect("resolved"));
    }

    #[test]
    fn ordering_on_boolean_is_mismatch() {
        let e = Expression::new("Ada", key(), Operation::Greater, Value::Bool(true));
        let err = e.with_snapshot(Value::Bool(false)).boolean();
        assert!(matches!(err, Err(StoryError::TypeMismatch { .. })));
        assert!(matches!(
            e.evaluate(Value::Bool(false)),
            Err(StoryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn snapshot_kind_mismatch() {
        let e = Expression::integer("Ada", key(), Operation::Equal, 1);
        assert!(matches!(
            e.with_snapshot(Value::Bool(true)).boolean(),
            Err(StoryError::TypeMismatch {
                expected: ValueKind::Boolean,
                found: ValueKind::Integer,
                ..
            })
        ));
    }

    #[test]
    fn evaluate_mutations() {
        let set = Expression::integer("Ada", key(), Operation::Assign, 5);
        assert_eq!(set.evaluate(Value::Int(3)).expect("set"), Value::Int(5));
        let inc = Expression::integer("Ada", key(), Operation::Increment, 2);
        assert_eq!(inc.evaluate(Value::Int(3)).expect("inc"), Value::Int(5));
        let dec = Expression::integer("Ada", key(), Operation::Decrement, 1);
        assert_eq!(dec.evaluate(Value::Int(i64::MIN)).expect("dec"), Value::Int(i64::MIN));
        let cmp = Expression::integer("Ada", key(), Operation::Less, 10);
        assert_eq!(cmp.evaluate(Value::Int(3)).expect("cmp"), Value::Int(3));
    }

    #[test]
    fn operation_tokens() {
        assert_eq!("=".parse::<Operation>().expect("op"), Operation::Assign);
        assert_eq!("set".parse::<Operation>().expect("op"), Operation::Assign);
        assert_eq!(" >= ".parse::<Operation>().expect("op"), Operation::GreaterOrEqual);
        assert!(matches!(
            "~=".parse::<Operation>(),
            Err(StoryError::UnknownOperation(t)) if t == "~="
        ));
        let op: Operation = serde_json::from_str("\"+\"").expect("alias");
        assert_eq!(op, Operation::Increment);
        assert_eq!(serde_json::to_string(&Operation::Less).expect("ser"), "\"<\"");
    }

    #[test]
    fn boolean_supports_only_assign_and_equality() {
        assert!(Operation::Assign.supports(ValueKind::Boolean));
        assert!(Operation::NotEqual.supports(ValueKind::Boolean));
        assert!(!Operation::Increment.supports(ValueKind::Boolean));
        assert!(!Operation::Less.supports(ValueKind::Boolean));
        assert!(Operation::Less.supports(ValueKind::Integer));
    }

    #[test]
    fn default_is_placeholder() {
        let e = Expression::default();
        assert_eq!(e.character(), "");
        assert_eq!(e.vec_key(), ".");
    }
}
