//! Error types for the StoryTree core library.

use thiserror::Error;

use crate::expression::Operation;
use crate::types::{ActionId, AttributeKey, ValueKind};

/// Top-level error type for all StoryTree operations.
#[derive(Error, Debug)]
pub enum StoryError {
    /// An expression targets an attribute the character was never given.
    #[error("Unknown attribute {key} on character '{character}'")]
    UnknownAttribute {
        /// Character the expression was routed to.
        character: String,
        /// The missing (class, type) address.
        key: AttributeKey,
    },

    /// The operation or payload does not fit the attribute's declared type.
    #[error("Type mismatch on {key}: '{operation}' expects {expected}, found {found}")]
    TypeMismatch {
        /// Attribute being operated on.
        key: AttributeKey,
        /// The offending operation.
        operation: Operation,
        /// Kind the attribute (or operation) requires.
        expected: ValueKind,
        /// Kind that was supplied.
        found: ValueKind,
    },

    /// A condition was asked for its truth value before it was resolved
    /// against a live attribute value.
    #[error("Expression on {key} has not been resolved against a live value")]
    UnresolvedExpression {
        /// Attribute the expression concerns.
        key: AttributeKey,
    },

    /// An operator token outside the supported vocabulary.
    #[error("Unknown operation token: '{0}'")]
    UnknownOperation(String),

    /// No character with the given name exists in the story.
    #[error("Unknown character: '{0}'")]
    UnknownCharacter(String),

    /// No action with the given id exists in a character's tree.
    #[error("Unknown action {id} for character '{character}'")]
    UnknownAction {
        /// Owner of the action tree that was searched.
        character: String,
        /// The missing action id.
        id: ActionId,
    },

    /// An action id was registered twice in the same tree.
    #[error("Duplicate action id: {0}")]
    DuplicateAction(ActionId),

    /// The attribute schema is malformed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, StoryError>;
