//! Memory bank: per-character history of characteristic transitions.
//!
//! Every expression a character applies is written here as a
//! [`Transition`]: the value before, and either the value after (a
//! mutation) or the comparison outcome. The bank is a bounded ring;
//! once [`MemoryConfig::max_transitions`] is reached the oldest record
//! is evicted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MemoryConfig;
use crate::expression::Operation;
use crate::types::{AttributeKey, Value};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Sink for characteristic transitions.
///
/// [`Character`](crate::Character) only ever appends; how the history is
/// stored or recalled is up to the implementation.
pub trait Memory {
    /// Append one transition.
    fn record(&mut self, transition: Transition);
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// What an applied expression did to its characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    /// The stored value changed (or was re-assigned to itself).
    Mutated {
        /// Value stored after the operation, post clamping.
        after: Value,
    },
    /// The stored value was only compared.
    Compared {
        /// Whether the comparison held.
        satisfied: bool,
    },
}

/// One recorded application of an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Position in the bank's history, assigned on record.
    pub sequence: u64,
    /// Wall-clock time of recording.
    pub recorded_at: DateTime<Utc>,
    /// Character whose attribute was touched.
    pub character: String,
    /// The attribute.
    pub key: AttributeKey,
    /// Operation applied.
    pub operation: Operation,
    /// Value before the operation.
    pub before: Value,
    /// Result of the operation.
    #[serde(flatten)]
    pub change: Change,
}

impl Transition {
    /// A new transition stamped with the current time.
    ///
    /// `sequence` is left at zero; [`MemoryBank::record`] numbers it.
    #[must_use]
    pub fn new(
        character: impl Into<String>,
        key: AttributeKey,
        operation: Operation,
        before: Value,
        change: Change,
    ) -> Self {
        Self {
            sequence: 0,
            recorded_at: Utc::now(),
            character: character.into(),
            key,
            operation,
            before,
            change,
        }
    }

    /// `true` if this transition changed (or re-assigned) the value.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self.change, Change::Mutated { .. })
    }
}

// ---------------------------------------------------------------------------
// MemoryBank
// ---------------------------------------------------------------------------

/// The default [`Memory`]: a bounded, ordered transition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBank {
    transitions: VecDeque<Transition>,
    max_transitions: usize,
    record_comparisons: bool,
    next_sequence: u64,
}

impl Default for MemoryBank {
    fn default() -> Self {
        Self::with_config(&MemoryConfig::default())
    }
}

impl MemoryBank {
    /// Create an empty bank with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bank with the given limits.
    #[must_use]
    pub fn with_config(config: &MemoryConfig) -> Self {
        Self {
            transitions: VecDeque::new(),
            max_transitions: config.max_transitions,
            record_comparisons: config.record_comparisons,
            next_sequence: 0,
        }
    }

    /// Number of retained transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// `true` if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Retained transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// The most recent transition.
    #[must_use]
    pub fn last(&self) -> Option<&Transition> {
        self.transitions.back()
    }

    /// Retained transitions for one attribute, oldest first.
    pub fn history_for<'a>(
        &'a self,
        key: &AttributeKey,
    ) -> impl Iterator<Item = &'a Transition> + use<'a> {
        let key = key.clone();
        self.transitions.iter().filter(move |t| t.key == key)
    }

    /// Retained mutations only, oldest first.
    pub fn mutations(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(|t| t.is_mutation())
    }

    /// Total transitions ever recorded, including evicted ones.
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.next_sequence
    }
}

impl Memory for MemoryBank {
    fn record(&mut self, mut transition: Transition) {
        if !self.record_comparisons && !transition.is_mutation() {
            return;
        }
        transition.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.transitions.push_back(transition);
        if self.max_transitions > 0 {
            while self.transitions.len() > self.max_transitions {
                self.transitions.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutation(key: &AttributeKey, before: i64, after: i64) -> Transition {
        Transition::new(
            "Ada",
            key.clone(),
            Operation::Assign,
            Value::Int(before),
            Change::Mutated {
                after: Value::Int(after),
            },
        )
    }

    fn comparison(key: &AttributeKey) -> Transition {
        Transition::new(
            "Ada",
            key.clone(),
            Operation::Equal,
            Value::Int(1),
            Change::Compared { satisfied: true },
        )
    }

    #[test]
    fn records_in_order_with_sequence() {
        let key = AttributeKey::new("mood", "anger");
        let mut bank = MemoryBank::new();
        bank.record(mutation(&key, 0, 1));
        bank.record(mutation(&key, 1, 2));

        let seqs: Vec<u64> = bank.iter().map(|t| t.sequence).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(
            bank.last().map(|t| t.change),
            Some(Change::Mutated { after: Value::Int(2) })
        );
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let key = AttributeKey::new("mood", "anger");
        let mut bank = MemoryBank::with_config(&MemoryConfig {
            max_transitions: 3,
            record_comparisons: true,
        });
        for i in 0..10 {
            bank.record(mutation(&key, i, i + 1));
        }
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.total_recorded(), 10);
        assert_eq!(bank.iter().next().map(|t| t.sequence), Some(7));
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let key = AttributeKey::new("mood", "anger");
        let mut bank = MemoryBank::with_config(&MemoryConfig {
            max_transitions: 0,
            record_comparisons: true,
        });
        for i in 0..500 {
            bank.record(mutation(&key, i, i + 1));
        }
        assert_eq!(bank.len(), 500);
    }

    #[test]
    fn comparisons_can_be_skipped() {
        let key = AttributeKey::new("mood", "anger");
        let mut bank = MemoryBank::with_config(&MemoryConfig {
            max_transitions: 16,
            record_comparisons: false,
        });
        bank.record(comparison(&key));
        bank.record(mutation(&key, 0, 4));
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.mutations().count(), 1);
    }

    #[test]
    fn history_filters_by_key() {
        let anger = AttributeKey::new("mood", "anger");
        let joy = AttributeKey::new("mood", "joy");
        let mut bank = MemoryBank::new();
        bank.record(mutation(&anger, 0, 1));
        bank.record(mutation(&joy, 0, 1));
        bank.record(comparison(&anger));
        assert_eq!(bank.history_for(&anger).count(), 2);
        assert_eq!(bank.history_for(&joy).count(), 1);
    }

    #[test]
    fn history_outlives_temporary_key() {
        let mut bank = MemoryBank::new();
        bank.record(mutation(&AttributeKey::new("gold", "purse"), 10, 7));
        let purse: Vec<&Transition> = bank
            .history_for(&AttributeKey::new("gold", "purse"))
            .collect();
        assert_eq!(purse.len(), 1);
        assert_eq!(purse[0].change, Change::Mutated { after: Value::Int(7) });
    }

    #[test]
    fn transition_serializes_flat() {
        let key = AttributeKey::new("mood", "anger");
        let json = serde_json::to_value(mutation(&key, 3, 5)).expect("ser");
        assert_eq!(json["change"], "mutated");
        assert_eq!(json["after"], 5);
        assert_eq!(json["operation"], "=");
    }
}
