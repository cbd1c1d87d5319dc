use super::diff::ItemDiffer;
use crate::{runtime::value::Value, scene::{SceneObject, TrackedProperty}};

fn object(id: &str, modified: u64) -> SceneObject {
    let mut object = SceneObject::new(id);
    object.last_modified = modified;
    object
}

#[test]
fn first_snapshot_is_all_created() {
    let mut differ = ItemDiffer::new();
    let diff = differ.update(&[object("a", 1), object("b", 1)]);

    let created: Vec<_> = diff.created.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(created, ["a", "b"]);
    assert!(diff.updated.is_empty());
    assert!(diff.deleted.is_empty());
    assert_eq!(differ.len(), 2);
}

#[test]
fn classifies_by_identity_and_modification_counter() {
    let mut differ = ItemDiffer::new();
    differ.update(&[object("a", 1), object("b", 1), object("c", 1)]);

    let mut moved = object("b", 2);
    moved.position.x = 40.0;
    let diff = differ.update(&[object("a", 1), moved, object("d", 1)]);

    assert_eq!(diff.created.len(), 1);
    assert_eq!(diff.created[0].id, "d");
    assert_eq!(diff.updated.len(), 1);
    assert_eq!(diff.updated[0].id(), "b");
    assert_eq!(
        diff.updated[0].changed_properties(),
        vec![(TrackedProperty::X, Value::Number(40.0))]
    );
    assert_eq!(diff.deleted_sorted(), ["c"]);
}

#[test]
fn unchanged_counter_is_not_an_update() {
    let mut differ = ItemDiffer::new();
    differ.update(&[object("a", 3)]);

    // Same counter, different content: the counter is authoritative.
    let mut same = object("a", 3);
    same.visible = false;
    assert!(differ.update(&[same]).is_empty());
}

#[test]
fn last_duplicate_in_a_snapshot_wins() {
    let mut differ = ItemDiffer::new();
    let mut later = object("a", 2);
    later.text = "later".into();
    let diff = differ.update(&[object("a", 1), later]);

    assert_eq!(diff.created.len(), 1);
    assert_eq!(diff.created[0].text, "later");
    assert_eq!(differ.get("a").map(|o| o.last_modified), Some(2));
}

#[test]
fn empty_snapshot_deletes_everything() {
    let mut differ = ItemDiffer::new();
    differ.update(&[object("a", 1), object("b", 1)]);
    let diff = differ.update(&[]);

    assert_eq!(diff.deleted.len(), 2);
    assert!(differ.is_empty());
}
