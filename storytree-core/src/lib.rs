//! # StoryTree Core Library
//!
//! Engine-agnostic narrative state for story and dialogue characters.
//!
//! Every character (NPC, player, the world itself) gets a [`Character`]
//! holding:
//!
//! - **Characteristics**: typed attributes addressed by a (class, type)
//!   [`AttributeKey`], either integers (optionally bounded) or booleans
//! - **Memory**: a [`MemoryBank`] of every transition applied to those
//!   attributes
//! - **Actions**: an [`ActionTree`] of narrative actions gated by
//!   [`Expression`] preconditions
//!
//! Script effects arrive as already-tokenized
//! `(class, type, operation, value)` tuples and are routed through
//! [`Character::parse_expression`]. A [`Story`] ties characters to an
//! attribute [`Schema`] and answers "which actions can this character
//! take now?". Inside a story, apply effects with
//! [`Story::parse_expression`] so every character's tree hears about them.
//!
//! ## Threading
//!
//! Narrative state advances one script event at a time. Nothing in this
//! crate locks; a host processing characters in parallel must give each
//! [`Character`] to one thread at a time.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod character;
pub mod characteristic;
pub mod config;
pub mod error;
pub mod expression;
pub mod memory;
pub mod schema;
pub mod story;
pub mod types;

pub use action::{Action, ActionTree, Actions};
pub use character::{Character, Outcome};
pub use characteristic::{Bounds, Characteristic};
pub use config::StoryConfig;
pub use error::StoryError;
pub use expression::{Condition, Expression, Operation};
pub use memory::{Memory, MemoryBank, Transition};
pub use schema::{ClassSchema, Schema};
pub use story::Story;
pub use types::*;
