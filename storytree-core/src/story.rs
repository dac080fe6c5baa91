//! Story: the character database and its client operations.
//!
//! A [`Story`] owns the attribute [`Schema`] and every [`Character`].
//! It loads definitions from JSON, answers which action paths a
//! character can take ([`Story::options`]) and runs them
//! ([`Story::execute_action`]).
//!
//! Definition layout on disk (see [`Story::from_dir`]):
//!
//! ```text
//! story/
//! ├── schema.json        [ClassSchema, ...]
//! ├── characters.json    { "characters": [...], "characteristics": [...] }
//! └── trees/
//!     └── <name>.json    [ActionDefinition, ...]
//! ```
//!
//! Preconditions and effects may name any character, so evaluation and
//! execution happen here rather than on a single [`Character`].

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::action::{Action, Actions};
use crate::character::{Character, Outcome};
use crate::config::StoryConfig;
use crate::error::{Result, StoryError};
use crate::expression::{Expression, Operation};
use crate::schema::Schema;
use crate::types::{ActionId, AttributeKey, Value};

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Contents of `characters.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterDefinitions {
    /// Character names to create.
    #[serde(default)]
    pub characters: Vec<String>,
    /// Initial attribute values.
    #[serde(default)]
    pub characteristics: Vec<CharacteristicEntry>,
}

/// One initial attribute value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacteristicEntry {
    /// Owning character.
    pub name: String,
    /// Attribute class.
    pub class: String,
    /// Attribute type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Starting value.
    pub value: Value,
}

/// A tokenized expression record, as found in tree files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionDefinition {
    /// Character the expression concerns.
    pub character: String,
    /// Attribute class.
    pub class: String,
    /// Attribute type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Operator token.
    pub operation: Operation,
    /// Right-hand side.
    pub value: Value,
}

impl From<ExpressionDefinition> for Expression {
    fn from(def: ExpressionDefinition) -> Self {
        Expression::new(
            def.character,
            AttributeKey::new(def.class, def.type_name),
            def.operation,
            def.value,
        )
    }
}

/// One action record in a character's tree file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Unique id within the tree.
    pub uid: ActionId,
    /// Display name.
    pub name: String,
    /// Entry point flag.
    #[serde(default)]
    pub first: bool,
    /// Exclusivity class.
    #[serde(default)]
    pub class: Option<String>,
    /// Gating conditions.
    #[serde(default)]
    pub preconditions: Vec<ExpressionDefinition>,
    /// Effects applied on execution.
    #[serde(default)]
    pub expressions: Vec<ExpressionDefinition>,
    /// Child action ids.
    #[serde(default)]
    pub leads_to: Vec<ActionId>,
    /// Parent action ids.
    #[serde(default)]
    pub parents: Vec<ActionId>,
}

impl From<ActionDefinition> for Action {
    fn from(def: ActionDefinition) -> Self {
        Action {
            name: def.name,
            first: def.first,
            class: def.class.filter(|c| !c.is_empty()),
            preconditions: def.preconditions.into_iter().map(Expression::from).collect(),
            effects: def.expressions.into_iter().map(Expression::from).collect(),
            children: def.leads_to,
            parents: def.parents,
        }
    }
}

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

/// The character database of one story.
#[derive(Debug, Clone)]
pub struct Story {
    config: StoryConfig,
    schema: Schema,
    characters: HashMap<String, Character>,
}

impl Story {
    /// A story holding only the configured built-in characters.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Config`] if a built-in name is empty.
    pub fn new(config: StoryConfig, schema: Schema) -> Result<Self> {
        let mut story = Self {
            config,
            schema,
            characters: HashMap::new(),
        };
        for name in story.config.story.builtin_characters.clone() {
            story.add_character(name)?;
        }
        Ok(story)
    }

    /// Load `schema.json`, `characters.json` and any `trees/<name>.json`
    /// from `dir`.
    ///
    /// # Errors
    ///
    /// I/O, JSON, schema and expression errors from any of the files.
    pub fn from_dir(dir: impl AsRef<Path>, config: StoryConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let schema = Schema::from_json(&std::fs::read_to_string(dir.join("schema.json"))?)?;
        info!(classes = schema.len(), path = %dir.display(), "Loaded schema");

        let mut story = Self::new(config, schema)?;
        story.load_characters_json(&std::fs::read_to_string(dir.join("characters.json"))?)?;

        for name in story.character_names() {
            let path = dir.join("trees").join(format!("{name}.json"));
            if !path.exists() {
                debug!(character = %name, "No tree file");
                continue;
            }
            story.load_tree_json(&name, &std::fs::read_to_string(&path)?)?;
        }
        Ok(story)
    }

    /// The story's configuration.
    #[must_use]
    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    /// The attribute schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a character, or return the existing one of that name.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::Config`] if `name` is empty.
    pub fn add_character(&mut self, name: impl Into<String>) -> Result<&mut Character> {
        let name = name.into();
        if !self.characters.contains_key(&name) {
            let character = Character::with_memory_config(name.clone(), &self.config.memory)?;
            self.characters.insert(name.clone(), character);
        }
        self.character_mut(&name)
    }

    /// Look up a character.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::UnknownCharacter`] if there is none by that name.
    pub fn character(&self, name: &str) -> Result<&Character> {
        self.characters
            .get(name)
            .ok_or_else(|| StoryError::UnknownCharacter(name.to_string()))
    }

    /// Look up a character mutably.
    ///
    /// Expressions applied through the returned character notify only its
    /// own action tree; use [`parse_expression`](Self::parse_expression)
    /// to reach every tree.
    ///
    /// # Errors
    ///
    /// Returns [`StoryError::UnknownCharacter`] if there is none by that name.
    pub fn character_mut(&mut self, name: &str) -> Result<&mut Character> {
        self.characters
            .get_mut(name)
            .ok_or_else(|| StoryError::UnknownCharacter(name.to_string()))
    }

    /// All character names, sorted.
    #[must_use]
    pub fn character_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.characters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Create characters and set their initial attribute values.
    ///
    /// Entries whose (class, type) the schema does not declare are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`StoryError::UnknownCharacter`] for an entry naming a character
    /// that was not listed, [`StoryError::TypeMismatch`] for a value of
    /// the wrong kind.
    pub fn load_characters(&mut self, defs: CharacterDefinitions) -> Result<()> {
        for name in defs.characters {
            self.add_character(name)?;
        }
        let mut loaded = 0_usize;
        for entry in defs.characteristics {
            let key = AttributeKey::new(entry.class, entry.type_name);
            let Some(characteristic) = self.schema.characteristic(&key) else {
                warn!(character = %entry.name, key = %key, "Skipping undeclared characteristic");
                continue;
            };
            let character = self
                .characters
                .get_mut(&entry.name)
                .ok_or_else(|| StoryError::UnknownCharacter(entry.name.clone()))?;
            character.add_characteristic(characteristic);
            character.parse_expression(&key.class, &key.type_name, Operation::Assign, entry.value)?;
            loaded += 1;
        }
        info!(characters = self.characters.len(), characteristics = loaded, "Loaded characters");
        Ok(())
    }

    /// [`load_characters`](Self::load_characters) from a JSON string.
    ///
    /// # Errors
    ///
    /// JSON errors plus those of `load_characters`.
    pub fn load_characters_json(&mut self, json: &str) -> Result<()> {
        self.load_characters(serde_json::from_str(json)?)
    }

    /// Register every action of a tree file on `character`.
    ///
    /// # Errors
    ///
    /// [`StoryError::UnknownCharacter`], or [`StoryError::DuplicateAction`]
    /// if a uid repeats.
    pub fn load_tree(&mut self, character: &str, defs: Vec<ActionDefinition>) -> Result<()> {
        let owner = self.character_mut(character)?;
        let count = defs.len();
        for def in defs {
            let uid = def.uid;
            owner.add_action(uid, Action::from(def))?;
        }
        info!(character = %character, actions = count, "Loaded action tree");
        Ok(())
    }

    /// [`load_tree`](Self::load_tree) from a JSON string.
    ///
    /// # Errors
    ///
    /// JSON errors plus those of `load_tree`.
    pub fn load_tree_json(&mut self, character: &str, json: &str) -> Result<()> {
        self.load_tree(character, serde_json::from_str(json)?)
    }

    /// The live value an expression would be compared against.
    ///
    /// A slot the character lacks but the schema declares reads as the
    /// schema default.
    fn current_value(&self, expression: &Expression) -> Result<Value> {
        let target = self.character(expression.character())?;
        target
            .value(expression.key())
            .or_else(|| {
                self.schema
                    .characteristic(expression.key())
                    .map(|c| c.value())
            })
            .ok_or_else(|| StoryError::UnknownAttribute {
                character: expression.character().to_string(),
                key: expression.key().clone(),
            })
    }

    /// Whether `expression` currently holds, reading its own character.
    ///
    /// # Errors
    ///
    /// Unknown character or attribute, or a type mismatch.
    pub fn evaluate(&self, expression: &Expression) -> Result<bool> {
        expression
            .with_snapshot(self.current_value(expression)?)
            .boolean()
    }

    /// Up to `max` action paths `character` can take right now.
    ///
    /// # Errors
    ///
    /// Unknown character, or any error evaluating a precondition.
    pub fn options(&self, character: &str, max: usize) -> Result<Vec<Vec<ActionId>>> {
        self.character(character)?
            .actions()
            .options(max, |e| self.evaluate(e))
    }

    /// [`options`](Self::options) with the configured default count.
    ///
    /// # Errors
    ///
    /// As for `options`.
    pub fn default_options(&self, character: &str) -> Result<Vec<Vec<ActionId>>> {
        self.options(character, self.config.story.default_option_count)
    }

    /// Display name of one of `character`'s actions.
    ///
    /// # Errors
    ///
    /// Unknown character or action.
    pub fn action_name(&self, character: &str, id: ActionId) -> Result<&str> {
        self.character(character)?
            .actions()
            .get(id)
            .map(|a| a.name.as_str())
            .ok_or_else(|| StoryError::UnknownAction {
                character: character.to_string(),
                id,
            })
    }

    /// Apply the effects of every action along `path`, in order.
    ///
    /// The whole path and every effect are checked before anything is
    /// applied, so an error leaves all characters untouched.
    ///
    /// # Errors
    ///
    /// Unknown character, action or attribute, or a type mismatch.
    pub fn execute_action(&mut self, character: &str, path: &[ActionId]) -> Result<Vec<Outcome>> {
        let tree = self.character(character)?.actions();
        let mut effects = Vec::new();
        for &id in path {
            let action = tree.get(id).ok_or_else(|| StoryError::UnknownAction {
                character: character.to_string(),
                id,
            })?;
            effects.extend(action.effects.iter().cloned());
        }

        for effect in &effects {
            self.check_effect(effect)?;
        }

        let mut outcomes = Vec::with_capacity(effects.len());
        for effect in &effects {
            outcomes.push(self.apply_effect(effect)?);
        }
        debug!(character = %character, path = ?path, effects = outcomes.len(), "Executed action path");
        Ok(outcomes)
    }

    /// Apply a tokenized `(class, type, operation, value)` tuple to
    /// `character`, telling every action tree about the change.
    ///
    /// This is the story-level counterpart of
    /// [`Character::parse_expression`]; changes made directly on a
    /// character from [`character_mut`](Self::character_mut) only reach
    /// that character's own tree. A slot the schema declares but the
    /// character lacks is added from the schema first.
    ///
    /// # Errors
    ///
    /// Unknown character or attribute, or a type mismatch. Nothing is
    /// changed on error.
    pub fn parse_expression(
        &mut self,
        character: &str,
        class: &str,
        type_name: &str,
        operation: Operation,
        value: impl Into<Value>,
    ) -> Result<Outcome> {
        let expression = Expression::new(
            character,
            AttributeKey::new(class, type_name),
            operation,
            value.into(),
        );
        self.check_effect(&expression)?;
        self.apply_effect(&expression)
    }

    /// Dry-run one effect against the current (or schema-default) value.
    fn check_effect(&self, effect: &Expression) -> Result<()> {
        let current = self.current_value(effect)?;
        if effect.operation().is_mutation() {
            effect.evaluate(current)?;
        } else {
            effect.with_snapshot(current).boolean()?;
        }
        Ok(())
    }

    /// Apply one effect to its target, materialising a schema-declared
    /// slot first, then tell every other tree the slot was touched.
    fn apply_effect(&mut self, effect: &Expression) -> Result<Outcome> {
        let key = effect.key();
        let target = self
            .characters
            .get_mut(effect.character())
            .ok_or_else(|| StoryError::UnknownCharacter(effect.character().to_string()))?;
        if target.characteristic(key).is_none() {
            if let Some(characteristic) = self.schema.characteristic(key) {
                debug!(character = %effect.character(), key = %key, "Materialising schema default");
                target.add_characteristic(characteristic);
            }
        }
        let outcome = target.apply_expression(effect)?;

        for (name, other) in &mut self.characters {
            if name != effect.character() {
                other.actions_mut().attribute_changed(effect.character(), key);
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"[
        { "class": "mood", "types": ["anger"], "min": 0, "max": 10, "defaultVal": 2 },
        { "class": "met", "types": ["Player"], "isBoolean": true, "defaultVal": false }
    ]"#;

    fn story() -> Story {
        Story::new(StoryConfig::default(), Schema::from_json(SCHEMA).expect("schema"))
            .expect("story")
    }

    #[test]
    fn builtins_exist() {
        let s = story();
        assert_eq!(s.character_names(), vec!["Player", "World"]);
        assert!(matches!(s.character("Nobody"), Err(StoryError::UnknownCharacter(_))));
    }

    #[test]
    fn load_characters_sets_values_and_skips_undeclared() {
        let mut s = story();
        s.load_characters_json(
            r#"{
                "characters": ["Ada"],
                "characteristics": [
                    { "name": "Ada", "class": "mood", "type": "anger", "value": 40 },
                    { "name": "Ada", "class": "mood", "type": "fear", "value": 1 }
                ]
            }"#,
        )
        .expect("load");
        let ada = s.character("Ada").expect("ada");
        assert_eq!(ada.value(&AttributeKey::new("mood", "anger")), Some(Value::Int(10)));
        assert_eq!(ada.value(&AttributeKey::new("mood", "fear")), None);
    }

    #[test]
    fn entry_for_unlisted_character_fails() {
        let mut s = story();
        let err = s.load_characters_json(
            r#"{ "characteristics": [
                { "name": "Ghost", "class": "mood", "type": "anger", "value": 1 }
            ] }"#,
        );
        assert!(matches!(err, Err(StoryError::UnknownCharacter(n)) if n == "Ghost"));
    }

    #[test]
    fn undeclared_precondition_is_unknown_attribute() {
        let mut s = story();
        s.load_tree_json(
            "World",
            r#"[{ "uid": 1, "name": "Odd", "first": true, "preconditions": [
                { "character": "World", "class": "weather", "type": "rain",
                  "operation": "==", "value": true }
            ] }]"#,
        )
        .expect("tree");
        assert!(matches!(
            s.options("World", 4),
            Err(StoryError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn action_name_lookup() {
        let mut s = story();
        s.load_tree_json("Player", r#"[{ "uid": 3, "name": "Wave", "first": true }]"#)
            .expect("tree");
        assert_eq!(s.action_name("Player", ActionId(3)).expect("named"), "Wave");
        assert!(matches!(
            s.action_name("Player", ActionId(4)),
            Err(StoryError::UnknownAction { .. })
        ));
    }

    #[test]
    fn empty_class_means_no_class() {
        let def: ActionDefinition =
            serde_json::from_str(r#"{ "uid": 1, "name": "A", "class": "", "leadsTo": [2] }"#)
                .expect("def");
        let action = Action::from(def);
        assert_eq!(action.class, None);
        assert_eq!(action.children, vec![ActionId(2)]);
    }
}
