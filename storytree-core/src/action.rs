//! Action tree: narrative actions gated by expressions.
//!
//! Each character owns one tree. An [`Action`] carries preconditions
//! (all must hold for the action to be reachable), effects (applied when
//! the action is executed) and links to child actions. Entry points are
//! the actions flagged `first`.
//!
//! ```text
//!   first ──▶ child ──▶ leaf   ← option path [first, child, leaf]
//!     │
//!     └────▶ leaf              ← option path [first, leaf]
//! ```
//!
//! A reachable leaf ends an *option*: the uid path from the entry action
//! down to it. Leaves sharing a `class` are mutually exclusive; only the
//! first one found is offered.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StoryError};
use crate::expression::Expression;
use crate::types::{ActionId, AttributeKey};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One narrative action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Display name, e.g. a dialogue line.
    pub name: String,
    /// Entry point of the tree.
    #[serde(default)]
    pub first: bool,
    /// Exclusivity class; at most one leaf per class is offered, and a
    /// class already offered prunes later branches of that class.
    #[serde(default)]
    pub class: Option<String>,
    /// Conditions that must all hold for the action to be reachable.
    #[serde(default)]
    pub preconditions: Vec<Expression>,
    /// Expressions applied when the action is executed.
    #[serde(default)]
    pub effects: Vec<Expression>,
    /// Actions this one leads to.
    #[serde(default)]
    pub children: Vec<ActionId>,
    /// Actions leading here.
    #[serde(default)]
    pub parents: Vec<ActionId>,
}

impl Action {
    /// A new action with no links or conditions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Mark as an entry point.
    #[must_use]
    pub fn as_first(mut self) -> Self {
        self.first = true;
        self
    }

    /// Set the exclusivity class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Add a precondition.
    #[must_use]
    pub fn with_precondition(mut self, expression: Expression) -> Self {
        self.preconditions.push(expression);
        self
    }

    /// Add an effect.
    #[must_use]
    pub fn with_effect(mut self, expression: Expression) -> Self {
        self.effects.push(expression);
        self
    }

    /// Add a child link.
    #[must_use]
    pub fn with_child(mut self, child: ActionId) -> Self {
        self.children.push(child);
        self
    }

    /// Add a parent link.
    #[must_use]
    pub fn with_parent(mut self, parent: ActionId) -> Self {
        self.parents.push(parent);
        self
    }

    /// `true` if the action leads nowhere.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// What a [`Character`](crate::Character) needs from its action store.
pub trait Actions {
    /// Register `action` under `id`.
    ///
    /// # Errors
    ///
    /// Implementations decide their key-collision policy; [`ActionTree`]
    /// rejects duplicates with [`StoryError::DuplicateAction`].
    fn register(&mut self, id: ActionId, action: Action) -> Result<()>;

    /// Signal that `character`'s attribute at `key` may have changed.
    fn attribute_changed(&mut self, character: &str, key: &AttributeKey);
}

// ---------------------------------------------------------------------------
// ActionTree
// ---------------------------------------------------------------------------

/// The default [`Actions`] store.
#[derive(Debug, Clone, Default)]
pub struct ActionTree {
    actions: BTreeMap<ActionId, Action>,
    firsts: Vec<ActionId>,
    /// (character, attribute) → actions with a precondition on it.
    watchers: HashMap<(String, AttributeKey), BTreeSet<ActionId>>,
    pending: BTreeSet<ActionId>,
}

impl ActionTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an action.
    #[must_use]
    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(&id)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ActionId) -> bool {
        self.actions.contains_key(&id)
    }

    /// Entry actions in registration order.
    #[must_use]
    pub fn firsts(&self) -> &[ActionId] {
        &self.firsts
    }

    /// All actions by id.
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.actions.iter().map(|(id, a)| (*id, a))
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// `true` if the tree has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions whose eligibility may have changed since the last
    /// [`take_pending`](Self::take_pending).
    #[must_use]
    pub fn pending(&self) -> &BTreeSet<ActionId> {
        &self.pending
    }

    /// Drain the re-evaluation queue.
    pub fn take_pending(&mut self) -> BTreeSet<ActionId> {
        std::mem::take(&mut self.pending)
    }

    /// Collect up to `max` option paths.
    ///
    /// Walks depth-first from each entry action. An action is entered
    /// only if `eval` returns `true` for every precondition. Reaching a
    /// leaf yields the path walked so far. Once a leaf of some class has
    /// been offered, every later action of that class is skipped along
    /// with its subtree. Cycles and dangling child ids are skipped.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `eval`.
    pub fn options<F>(&self, max: usize, mut eval: F) -> Result<Vec<Vec<ActionId>>>
    where
        F: FnMut(&Expression) -> Result<bool>,
    {
        let mut walk = Walk {
            max,
            options: Vec::new(),
            used_classes: HashSet::new(),
            path: Vec::new(),
        };
        for &first in &self.firsts {
            if walk.options.len() >= max {
                break;
            }
            self.visit(first, &mut walk, &mut eval)?;
        }
        Ok(walk.options)
    }

    fn visit<F>(&self, id: ActionId, walk: &mut Walk, eval: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<bool>,
    {
        if walk.options.len() >= walk.max || walk.path.contains(&id) {
            return Ok(());
        }
        let Some(action) = self.actions.get(&id) else {
            warn!(action = %id, "Skipping dangling child reference");
            return Ok(());
        };
        for precondition in &action.preconditions {
            if !eval(precondition)? {
                return Ok(());
            }
        }

        // A class already offered prunes the whole branch, not just leaves.
        if action
            .class
            .as_ref()
            .is_some_and(|class| walk.used_classes.contains(class))
        {
            return Ok(());
        }

        walk.path.push(id);
        if action.is_leaf() {
            walk.options.push(walk.path.clone());
            if let Some(class) = &action.class {
                walk.used_classes.insert(class.clone());
            }
        } else {
            for &child in &action.children {
                self.visit(child, walk, eval)?;
            }
        }
        walk.path.pop();
        Ok(())
    }
}

/// Traversal state for [`ActionTree::options`].
struct Walk {
    max: usize,
    options: Vec<Vec<ActionId>>,
    used_classes: HashSet<String>,
    path: Vec<ActionId>,
}

impl Actions for ActionTree {
    fn register(&mut self, id: ActionId, action: Action) -> Result<()> {
        if self.actions.contains_key(&id) {
            return Err(StoryError::DuplicateAction(id));
        }
        for precondition in &action.preconditions {
            self.watchers
                .entry((precondition.character().to_string(), precondition.key().clone()))
                .or_default()
                .insert(id);
        }
        if action.first {
            self.firsts.push(id);
        }
        debug!(action = %id, name = %action.name, "Registered action");
        self.actions.insert(id, action);
        Ok(())
    }

    fn attribute_changed(&mut self, character: &str, key: &AttributeKey) {
        if let Some(ids) = self.watchers.get(&(character.to_string(), key.clone())) {
            self.pending.extend(ids.iter().copied());
        }
    }
}
