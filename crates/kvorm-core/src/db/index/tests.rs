use crate::{
    db::{
        index::{IndexError, IndexOp, index_mutations_for_delete, index_mutations_for_save},
        state::RecordState,
        store::{Command, CommandExecutor, MemoryStore},
    },
    model::{FieldDef, ModelSpec, RecordDef, compile},
    value::{ScalarKind, Value, encode},
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn scored_spec() -> ModelSpec {
    compile(
        &RecordDef::new("T")
            .identity("Id")
            .field(FieldDef::scalar("Score", ScalarKind::Int).indexed())
            .field(FieldDef::optional("Tag", ScalarKind::Text).indexed())
            .field(FieldDef::text("Note")),
    )
    .unwrap()
}

fn state(id: &str, score: i64, tag: Option<&str>) -> RecordState {
    let mut values = BTreeMap::new();
    values.insert("Score".to_string(), Value::Int(score));
    values.insert("Tag".to_string(), tag.map_or(Value::Null, Value::from));
    values.insert("Note".to_string(), Value::from("n"));

    RecordState {
        type_name: "T".to_string(),
        id: id.to_string(),
        values,
    }
}

fn set_add(key: &str, member: &str) -> IndexOp {
    IndexOp::AddToSet {
        key: key.to_string(),
        member: member.to_string(),
    }
}

fn set_remove(key: &str, member: &str) -> IndexOp {
    IndexOp::RemoveFromSet {
        key: key.to_string(),
        member: member.to_string(),
    }
}

#[test]
fn insert_adds_set_and_range_memberships() {
    let spec = scored_spec();
    let ops = index_mutations_for_save(&spec, None, &state("1", 5, Some("a"))).unwrap();

    assert_eq!(
        ops,
        [
            set_add("T:Score:5", "1"),
            IndexOp::AddToSortedSet {
                key: "T:Score".to_string(),
                member: "1".to_string(),
                score: 5.0,
            },
            set_add("T:Tag:a", "1"),
        ]
    );
}

#[test]
fn null_pointer_has_no_membership() {
    let spec = scored_spec();
    let ops = index_mutations_for_save(&spec, None, &state("1", 5, None)).unwrap();

    assert!(
        !ops.iter()
            .any(|op| matches!(op, IndexOp::AddToSet { key, .. } if key.starts_with("T:Tag")))
    );
}

#[test]
fn changed_value_removes_before_adding() {
    let spec = scored_spec();
    let old = state("1", 5, Some("a"));
    let new = state("1", 5, Some("b"));

    let ops = index_mutations_for_save(&spec, Some(&old), &new).unwrap();
    let first_insert = ops.iter().position(IndexOp::is_insert).unwrap();

    assert_eq!(ops[..first_insert], [set_remove("T:Tag:a", "1")]);
    assert!(ops.contains(&set_add("T:Tag:b", "1")));
    // unchanged values are re-added, never removed
    assert!(ops.contains(&set_add("T:Score:5", "1")));
    assert!(!ops.contains(&set_remove("T:Score:5", "1")));
}

#[test]
fn clearing_a_pointer_only_removes() {
    let spec = scored_spec();
    let old = state("1", 5, Some("a"));
    let new = state("1", 5, None);

    let ops = index_mutations_for_save(&spec, Some(&old), &new).unwrap();

    assert!(ops.contains(&set_remove("T:Tag:a", "1")));
    assert!(!ops.iter().any(|op| op.is_insert() && op.to_string().contains("T:Tag")));
}

#[test]
fn delete_removes_every_membership() {
    let spec = scored_spec();
    let ops = index_mutations_for_delete(&spec, &state("1", 5, Some("a"))).unwrap();

    assert_eq!(
        ops,
        [
            set_remove("T:Score:5", "1"),
            IndexOp::RemoveFromSortedSet {
                key: "T:Score".to_string(),
                member: "1".to_string(),
            },
            set_remove("T:Tag:a", "1"),
        ]
    );
}

#[test]
fn kind_mismatch_is_an_invariant_error() {
    let spec = scored_spec();
    let mut bad = state("1", 5, None);
    bad.values.insert("Score".to_string(), Value::from("five"));

    assert!(matches!(
        index_mutations_for_save(&spec, None, &bad),
        Err(IndexError::KindMismatch { .. })
    ));
}

#[test]
fn ops_render_as_store_commands() {
    let op = set_add("T:Tag:a", "1");

    assert_eq!(
        Command::from(op.clone()),
        Command::SetAdd {
            key: "T:Tag:a".to_string(),
            member: "1".to_string(),
        }
    );
    assert_eq!(op.to_string(), "SADD T:Tag:a 1");
}

///
/// Property: after any sequence of saves and deletes, the index holds
/// exactly the memberships implied by the surviving records.
///

#[derive(Clone, Debug)]
enum Step {
    Save { id: u8, score: i64, tag: Option<u8> },
    Delete { id: u8 },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0u8..4, -2i64..3, prop::option::of(0u8..3))
            .prop_map(|(id, score, tag)| Step::Save { id, score, tag }),
        1 => (0u8..4).prop_map(|id| Step::Delete { id }),
    ]
}

fn members_with_prefix(store: &MemoryStore, prefix: &str) -> BTreeSet<(String, String)> {
    let mut found = BTreeSet::new();
    for key in store.keys().unwrap() {
        if let Some(value) = key.strip_prefix(prefix) {
            for member in store.set_members(&key).unwrap() {
                found.insert((value.to_string(), member));
            }
        }
    }
    found
}

proptest! {
    #[test]
    fn index_matches_live_records(steps in prop::collection::vec(arb_step(), 0..24)) {
        let spec = scored_spec();
        let store = MemoryStore::new();
        let mut live: BTreeMap<String, RecordState> = BTreeMap::new();

        for step in steps {
            match step {
                Step::Save { id, score, tag } => {
                    let id = id.to_string();
                    let tag = tag.map(|t| format!("t{t}"));
                    let new = state(&id, score, tag.as_deref());
                    let ops = index_mutations_for_save(&spec, live.get(&id), &new).unwrap();
                    let batch: Vec<Command> = ops.into_iter().map(Command::from).collect();
                    store.execute(&batch).unwrap();
                    live.insert(id, new);
                }
                Step::Delete { id } => {
                    if let Some(old) = live.remove(&id.to_string()) {
                        let ops = index_mutations_for_delete(&spec, &old).unwrap();
                        let batch: Vec<Command> = ops.into_iter().map(Command::from).collect();
                        store.execute(&batch).unwrap();
                    }
                }
            }
        }

        let expected_scores: BTreeSet<_> = live
            .values()
            .map(|s| (encode(&s.values["Score"]).unwrap().unwrap(), s.id.clone()))
            .collect();
        let expected_tags: BTreeSet<_> = live
            .values()
            .filter_map(|s| s.values["Tag"].as_text().map(|t| (t.to_string(), s.id.clone())))
            .collect();

        prop_assert_eq!(members_with_prefix(&store, "T:Score:"), expected_scores);
        prop_assert_eq!(members_with_prefix(&store, "T:Tag:"), expected_tags);

        let ranged: BTreeSet<String> = store
            .sorted_range_by_score("T:Score", f64::MIN, f64::MAX)
            .unwrap()
            .into_iter()
            .collect();
        prop_assert_eq!(ranged, live.keys().cloned().collect::<BTreeSet<_>>());
    }
}
