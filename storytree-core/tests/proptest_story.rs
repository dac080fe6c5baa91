//! Property-Based Tests for Story Options
//!
//! Random action trees over one character, checked against
//! [`Story::evaluate`]: every offered path must be walkable right now.

use proptest::prelude::*;

use storytree_core::action::Action;
use storytree_core::config::StoryConfig;
use storytree_core::expression::{Expression, Operation};
use storytree_core::schema::Schema;
use storytree_core::story::Story;
use storytree_core::types::{ActionId, AttributeKey};

const SCHEMA: &str = r#"[
    { "class": "mood", "types": ["anger", "joy"], "min": 0, "max": 10, "defaultVal": 5 }
]"#;

/// One generated action: first flag, class slot, preconditions, children.
type ActionSeed = (bool, usize, Vec<(bool, Operation, i64)>, Vec<u32>);

fn arb_comparison() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Equal),
        Just(Operation::NotEqual),
        Just(Operation::Greater),
        Just(Operation::Less),
        Just(Operation::GreaterOrEqual),
        Just(Operation::LessOrEqual),
    ]
}

fn arb_seed() -> impl Strategy<Value = ActionSeed> {
    (
        any::<bool>(),
        0..3usize,
        prop::collection::vec((any::<bool>(), arb_comparison(), 0..=10i64), 0..3),
        prop::collection::vec(1..=14u32, 0..3),
    )
}

/// A story whose `Ada` has `mood.anger` loaded and `mood.joy` left to
/// the schema default, with one action per seed (uids from 1).
fn story_from(anger: i64, seeds: Vec<ActionSeed>) -> Story {
    let mut story = Story::new(
        StoryConfig::default(),
        Schema::from_json(SCHEMA).expect("schema"),
    )
    .expect("story");
    story.add_character("Ada").expect("ada");
    story
        .load_characters_json(&format!(
            r#"{{ "characteristics": [
                {{ "name": "Ada", "class": "mood", "type": "anger", "value": {anger} }}
            ] }}"#
        ))
        .expect("characters");

    let ada = story.character_mut("Ada").expect("ada");
    for (index, (first, class, preconditions, children)) in seeds.into_iter().enumerate() {
        let uid = u32::try_from(index + 1).expect("small tree");
        let mut action = Action::new(format!("action {uid}"));
        if first {
            action = action.as_first();
        }
        match class {
            1 => action = action.with_class("ask"),
            2 => action = action.with_class("leave"),
            _ => {}
        }
        for (loaded, operation, value) in preconditions {
            let type_name = if loaded { "anger" } else { "joy" };
            action = action.with_precondition(Expression::integer(
                "Ada",
                AttributeKey::new("mood", type_name),
                operation,
                value,
            ));
        }
        for child in children {
            action = action.with_child(ActionId(child));
        }
        ada.add_action(ActionId(uid), action).expect("fresh uid");
    }
    story
}

proptest! {
    #[test]
    fn offered_paths_are_walkable(
        anger in 0..=10i64,
        seeds in prop::collection::vec(arb_seed(), 1..12),
        max in 1..8usize,
    ) {
        let story = story_from(anger, seeds);
        let options = story.options("Ada", max).expect("options");
        prop_assert!(options.len() <= max);

        let tree = story.character("Ada").expect("ada").actions();
        for path in &options {
            prop_assert!(!path.is_empty());
            let head = tree.get(path[0]).expect("offered action exists");
            prop_assert!(head.first);
            for pair in path.windows(2) {
                let parent = tree.get(pair[0]).expect("offered action exists");
                prop_assert!(parent.children.contains(&pair[1]));
            }
            let last = path.last().and_then(|id| tree.get(*id)).expect("leaf exists");
            prop_assert!(last.is_leaf());

            for id in path {
                let action = tree.get(*id).expect("offered action exists");
                for precondition in &action.preconditions {
                    prop_assert!(story.evaluate(precondition).expect("evaluates"));
                }
            }
        }

        // Options never write the schema default into the character.
        let ada = story.character("Ada").expect("ada");
        prop_assert!(ada.characteristic(&AttributeKey::new("mood", "joy")).is_none());
    }
}
