//! Character: a named owner of characteristics, memory and actions.
//!
//! All script effects reach a character through
//! [`Character::parse_expression`] (or [`Character::apply_expression`]
//! for a prebuilt [`Expression`]). One call:
//!
//! 1. builds the expression from the tokenized tuple,
//! 2. resolves the characteristic at its (class, type) address,
//! 3. compares or mutates, clamped to the characteristic's bounds,
//! 4. records the transition in memory,
//! 5. tells the action store the address was touched.
//!
//! Steps 2 and 3 fail before anything is written, so a rejected
//! expression leaves the character exactly as it was.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::action::{Action, ActionTree, Actions};
use crate::characteristic::Characteristic;
use crate::config::MemoryConfig;
use crate::error::{Result, StoryError};
use crate::expression::{Expression, Operation};
use crate::memory::{Change, Memory, MemoryBank, Transition};
use crate::types::{ActionId, AttributeKey, Value};

/// Result of applying one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A comparison was evaluated; nothing was stored.
    Compared {
        /// The expression, resolved against the value it was compared to.
        expression: Expression,
        /// Whether the comparison held.
        satisfied: bool,
    },
    /// A new value was stored.
    Mutated {
        /// The expression, resolved against the value before the write.
        expression: Expression,
        /// Value before.
        before: Value,
        /// Value stored, after clamping.
        after: Value,
    },
}

impl Outcome {
    /// The resolved expression that produced this outcome.
    ///
    /// A mutation's expression carries the value from *before* the write,
    /// so calling [`Expression::boolean`] on it tests the old value. Use
    /// [`satisfied`](Self::satisfied) to ask whether the outcome held.
    #[must_use]
    pub fn expression(&self) -> &Expression {
        match self {
            Self::Compared { expression, .. } | Self::Mutated { expression, .. } => expression,
        }
    }

    /// For comparisons, whether they held; mutations always count as satisfied.
    #[must_use]
    pub fn satisfied(&self) -> bool {
        match self {
            Self::Compared { satisfied, .. } => *satisfied,
            Self::Mutated { .. } => true,
        }
    }
}

/// A story character.
///
/// Generic over its memory and action store so either can be swapped
/// for a fake in tests; the defaults are [`MemoryBank`] and [`ActionTree`].
#[derive(Debug, Clone)]
pub struct Character<M = MemoryBank, A = ActionTree> {
    name: String,
    characteristics: HashMap<AttributeKey, Characteristic>,
    memory: M,
    actions: A,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            name: "Unnamed".to_string(),
            characteristics: HashMap::new(),
            memory: MemoryBank::new(),
            actions: ActionTree::new(),
        }
    }
}

impl Character {
    /// A character with an empty memory bank and action tree.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Config`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_parts(name, MemoryBank::new(), ActionTree::new())
    }

    /// Like [`new`](Self::new), with memory limits from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Config`] if `name` is empty.
    pub fn with_memory_config(name: impl Into<String>, config: &MemoryConfig) -> Result<Self> {
        Self::with_parts(name, MemoryBank::with_config(config), ActionTree::new())
    }
}

impl<M: Memory, A: Actions> Character<M, A> {
    /// A character built from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Config`] if `name` is empty.
    pub fn with_parts(name: impl Into<String>, memory: M, actions: A) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StoryError::Config("character name must not be empty".to_string()));
        }
        Ok(Self {
            name,
            characteristics: HashMap::new(),
            memory,
            actions,
        })
    }

    /// The character's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a characteristic at its own address, replacing any
    /// previous one there.
    pub fn add_characteristic(&mut self, characteristic: Characteristic) {
        self.characteristics
            .insert(characteristic.key().clone(), characteristic);
    }

    /// The characteristic at `key`.
    #[must_use]
    pub fn characteristic(&self, key: &AttributeKey) -> Option<&Characteristic> {
        self.characteristics.get(key)
    }

    /// Current value at `key`.
    #[must_use]
    pub fn value(&self, key: &AttributeKey) -> Option<Value> {
        self.characteristics.get(key).map(Characteristic::value)
    }

    /// All characteristics, in no particular order.
    pub fn characteristics(&self) -> impl Iterator<Item = &Characteristic> {
        self.characteristics.values()
    }

    /// The memory store.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// The action store.
    pub fn actions(&self) -> &A {
        &self.actions
    }

    /// Mutable access to the action store.
    pub fn actions_mut(&mut self) -> &mut A {
        &mut self.actions
    }

    /// Apply a tokenized `(class, type, operation, value)` tuple.
    ///
    /// `value` may be an integer or a boolean; the expression variant is
    /// picked from it.
    ///
    /// # Errors
    ///
    /// - [`StoryError::UnknownAttribute`] if nothing is registered at
    ///   (class, type).
    /// - [`StoryError::TypeMismatch`] if the value or operation does not
    ///   fit the characteristic's kind.
    ///
    /// In both cases nothing is stored or recorded.
    pub fn parse_expression(
        &mut self,
        class: &str,
        type_name: &str,
        operation: Operation,
        value: impl Into<Value>,
    ) -> Result<Outcome> {
        let expression = Expression::new(
            self.name.clone(),
            AttributeKey::new(class, type_name),
            operation,
            value.into(),
        );
        self.apply_expression(&expression)
    }

    /// Resolve `expression` against the current value, without applying it.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::UnknownAttribute`] if the address is not registered.
    pub fn resolve(&self, expression: &Expression) -> Result<Expression> {
        self.characteristics
            .get(expression.key())
            .map(|c| expression.with_snapshot(c.value()))
            .ok_or_else(|| StoryError::UnknownAttribute {
                character: self.name.clone(),
                key: expression.key().clone(),
            })
    }

    /// Apply a prebuilt expression to this character.
    ///
    /// The expression's own character name is not checked; callers route
    /// by name before getting here.
    ///
    /// # Errors
    ///
    /// Same as [`parse_expression`](Self::parse_expression).
    pub fn apply_expression(&mut self, expression: &Expression) -> Result<Outcome> {
        let result = self.apply_unrecorded(expression);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(character = %self.name, expression = %expression, error = %err, "Rejected expression");
                return Err(err);
            }
        };

        let (before, change) = match &outcome {
            Outcome::Compared { expression, satisfied } => (
                expression.snapshot().unwrap_or(expression.value()),
                Change::Compared {
                    satisfied: *satisfied,
                },
            ),
            Outcome::Mutated { before, after, .. } => (*before, Change::Mutated { after: *after }),
        };
        self.memory.record(Transition::new(
            self.name.clone(),
            expression.key().clone(),
            expression.operation(),
            before,
            change,
        ));
        self.actions.attribute_changed(&self.name, expression.key());

        debug!(
            character = %self.name,
            key = %expression.key(),
            operation = %expression.operation(),
            satisfied = outcome.satisfied(),
            "Applied expression"
        );
        Ok(outcome)
    }

    /// Steps 2 and 3: resolve, check and (for mutations) store.
    fn apply_unrecorded(&mut self, expression: &Expression) -> Result<Outcome> {
        let resolved = self.resolve(expression)?;
        let characteristic = self
            .characteristics
            .get_mut(expression.key())
            .ok_or_else(|| StoryError::UnknownAttribute {
                character: self.name.clone(),
                key: expression.key().clone(),
            })?;
        let before = characteristic.value();

        if expression.operation().is_comparison() {
            let satisfied = resolved.boolean()?;
            return Ok(Outcome::Compared {
                expression: resolved,
                satisfied,
            });
        }

        let next = resolved.evaluate(before)?;
        let after = characteristic.set(next)?;
        Ok(Outcome::Mutated {
            expression: resolved,
            before,
            after,
        })
    }

    /// Register a narrative action in this character's action store.
    ///
    /// # Errors
    ///
    /// Whatever the store's collision policy returns.
    pub fn add_action(&mut self, uid: ActionId, action: Action) -> Result<()> {
        self.actions.register(uid, action)
    }
}
