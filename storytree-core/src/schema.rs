//! Attribute schema: which characteristic slots a story declares.
//!
//! Each [`ClassSchema`] declares one class: its type names, whether it
//! is boolean or integer, integer bounds and a default value. The
//! schema is loaded once per story, before any character, and is the
//! source of defaults when a slot is first touched.
//!
//! JSON shape (one entry per class):
//!
//! ```json
//! [
//!   { "class": "mood", "types": ["anger", "joy"], "isBoolean": false,
//!     "min": 0, "max": 10, "defaultVal": 5 },
//!   { "class": "met", "types": ["Player"], "isBoolean": true,
//!     "defaultVal": false }
//! ]
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::characteristic::Characteristic;
use crate::error::{Result, StoryError};
use crate::types::{AttributeKey, Value, ValueKind, is_valid_identifier};

/// Declaration of one attribute class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    /// Class name.
    pub class: String,
    /// Type names inside the class.
    pub types: Vec<String>,
    /// Boolean class if `true`, integer otherwise.
    #[serde(default)]
    pub is_boolean: bool,
    /// Lower bound for integer classes.
    #[serde(default)]
    pub min: Option<i64>,
    /// Upper bound for integer classes.
    #[serde(default)]
    pub max: Option<i64>,
    /// Initial value for every type of the class.
    #[serde(rename = "defaultVal")]
    pub default: Value,
}

impl ClassSchema {
    /// The value kind every type of this class holds.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        if self.is_boolean {
            ValueKind::Boolean
        } else {
            ValueKind::Integer
        }
    }

    /// Whether `type_name` is declared in this class.
    #[must_use]
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t == type_name)
    }

    /// Check the declaration is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Schema`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(&self.class) {
            return Err(StoryError::Schema(format!(
                "invalid class name '{}'",
                self.class
            )));
        }
        if self.types.is_empty() {
            return Err(StoryError::Schema(format!(
                "class '{}' declares no types",
                self.class
            )));
        }
        if let Some(bad) = self.types.iter().find(|t| !is_valid_identifier(t)) {
            return Err(StoryError::Schema(format!(
                "class '{}' has invalid type name '{bad}'",
                self.class
            )));
        }
        if self.default.kind() != self.kind() {
            return Err(StoryError::Schema(format!(
                "class '{}' is {} but its default is {}",
                self.class,
                self.kind(),
                self.default.kind()
            )));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(StoryError::Schema(format!(
                    "class '{}' has min {min} above max {max}",
                    self.class
                )));
            }
        }
        if let Value::Int(default) = self.default {
            let below = self.min.is_some_and(|min| default < min);
            let above = self.max.is_some_and(|max| default > max);
            if below || above {
                return Err(StoryError::Schema(format!(
                    "class '{}' default {default} is outside its bounds",
                    self.class
                )));
            }
        }
        Ok(())
    }

    /// A fresh characteristic for `type_name`, holding the class default.
    #[must_use]
    pub fn characteristic(&self, type_name: &str) -> Characteristic {
        let key = AttributeKey::new(self.class.clone(), type_name);
        match self.default {
            Value::Bool(v) => Characteristic::boolean(key, v),
            Value::Int(v) => {
                let c = Characteristic::integer(key, v);
                match (self.min, self.max) {
                    (None, None) => c,
                    (min, max) => c.with_bounds(min.unwrap_or(i64::MIN), max.unwrap_or(i64::MAX)),
                }
            }
        }
    }
}

/// All declared attribute classes of a story.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    classes: HashMap<String, ClassSchema>,
}

impl Schema {
    /// An empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON array of class declarations.
    ///
    /// # Errors
    ///
    /// [`StoryError::Serialization`] on malformed JSON,
    /// [`StoryError::Schema`] on an invalid declaration.
    pub fn from_json(json: &str) -> Result<Self> {
        let classes: Vec<ClassSchema> = serde_json::from_str(json)?;
        let mut schema = Self::new();
        for class in classes {
            schema.add_class(class)?;
        }
        Ok(schema)
    }

    /// Declare a class, replacing any previous declaration of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Schema`] if the declaration is invalid.
    pub fn add_class(&mut self, class: ClassSchema) -> Result<()> {
        class.validate()?;
        self.classes.insert(class.class.clone(), class);
        Ok(())
    }

    /// Look up a class declaration.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassSchema> {
        self.classes.get(name)
    }

    /// Whether `key` names a declared (class, type) slot.
    #[must_use]
    pub fn declares(&self, key: &AttributeKey) -> bool {
        self.class(&key.class)
            .is_some_and(|c| c.has_type(&key.type_name))
    }

    /// A default characteristic for a declared slot.
    #[must_use]
    pub fn characteristic(&self, key: &AttributeKey) -> Option<Characteristic> {
        self.class(&key.class)
            .filter(|c| c.has_type(&key.type_name))
            .map(|c| c.characteristic(&key.type_name))
    }

    /// Number of declared classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// `true` if no class is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
