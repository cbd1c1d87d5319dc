use super::{Aabb, AabbTree, CollisionEngine, CollisionPair};
use crate::{
    runtime::diff::ItemDiffer,
    scene::{SceneObject, Vector2},
};

fn piece(id: &str, x: f64, y: f64, modified: u64) -> SceneObject {
    let mut object = SceneObject::new(id)
        .with_position(x, y)
        .with_size(10.0, 10.0)
        .with_layer("PROP");
    object.last_modified = modified;
    object
}

fn square(x: f64, y: f64) -> Aabb {
    Aabb::from_center(Vector2::new(x, y), 5.0, 5.0)
}

#[test]
fn strict_overlap_excludes_shared_edges() {
    assert!(square(0.0, 0.0).overlaps(&square(9.0, 0.0)));
    assert!(!square(0.0, 0.0).overlaps(&square(10.0, 0.0)));
    assert!(!square(0.0, 0.0).overlaps(&square(0.0, -10.0)));
}

#[test]
fn rotated_footprint_grows_the_box() {
    let mut object = piece("p", 0.0, 0.0, 1).with_size(20.0, 10.0);
    let flat = Aabb::from_object(&object);
    object.rotation = 90.0;
    let turned = Aabb::from_object(&object);

    assert!((flat.max.x - 10.0).abs() < 1e-9);
    assert!((turned.max.x - 5.0).abs() < 1e-9);
    assert!((turned.max.y - 10.0).abs() < 1e-9);
}

#[test]
fn tree_stays_valid_through_churn() {
    let mut tree = AabbTree::new();
    for i in 0..64 {
        let x = (i % 8) as f64 * 12.0;
        let y = (i / 8) as f64 * 12.0;
        tree.insert(format!("o{}", i), square(x, y));
        assert!(tree.validate());
    }
    assert_eq!(tree.len(), 64);

    for i in (0..64).step_by(3) {
        assert!(tree.remove(&format!("o{}", i)));
        assert!(tree.validate());
    }
    assert!(!tree.remove("o0"));

    // Moving a leaf replaces it.
    tree.insert("o1".to_string(), square(500.0, 500.0));
    assert!(tree.validate());
    assert_eq!(tree.query(&square(500.0, 500.0)), ["o1"]);
}

#[test]
fn query_matches_brute_force() {
    let mut tree = AabbTree::new();
    let mut boxes = Vec::new();
    for i in 0..40 {
        let aabb = square((i * 7 % 50) as f64, (i * 13 % 50) as f64);
        tree.insert(format!("o{}", i), aabb);
        boxes.push((format!("o{}", i), aabb));
    }

    let probe = Aabb::new(Vector2::new(10.0, 10.0), Vector2::new(30.0, 25.0));
    let mut found = tree.query(&probe);
    found.sort();
    let mut expected: Vec<String> = boxes
        .iter()
        .filter(|(_, aabb)| aabb.overlaps(&probe))
        .map(|(id, _)| id.clone())
        .collect();
    expected.sort();
    assert_eq!(found, expected);
}

#[test]
fn each_new_overlap_is_reported_once() {
    let mut differ = ItemDiffer::new();
    let mut engine = CollisionEngine::new();

    let update = engine.update(&differ.update(&[
        piece("a", 0.0, 0.0, 1),
        piece("b", 8.0, 0.0, 1),
        piece("c", 100.0, 0.0, 1),
    ]));
    assert_eq!(update.new_collisions, vec![CollisionPair::new("b", "a")]);
    assert!(update.finished_collisions.is_empty());
    assert!(engine.is_touching("a", "b"));
    assert!(engine.is_touching("b", "a"));
    assert!(engine.is_symmetric());

    // Both members moved in the same batch and still overlap: no event.
    let update = engine.update(&differ.update(&[
        piece("a", 1.0, 0.0, 2),
        piece("b", 9.0, 0.0, 2),
        piece("c", 100.0, 0.0, 1),
    ]));
    assert!(update.is_empty());
}

#[test]
fn separation_and_deletion_finish_collisions() {
    let mut differ = ItemDiffer::new();
    let mut engine = CollisionEngine::new();
    engine.update(&differ.update(&[
        piece("a", 0.0, 0.0, 1),
        piece("b", 8.0, 0.0, 1),
        piece("c", -8.0, 0.0, 1),
    ]));
    assert_eq!(engine.overlapping("a"), ["b", "c"]);

    let update = engine.update(&differ.update(&[
        piece("a", 0.0, 0.0, 1),
        piece("b", 50.0, 0.0, 2),
        piece("c", -8.0, 0.0, 1),
    ]));
    assert_eq!(update.finished_collisions, vec![CollisionPair::new("a", "b")]);

    let update = engine.update(&differ.update(&[piece("a", 0.0, 0.0, 1), piece("b", 50.0, 0.0, 2)]));
    assert_eq!(update.finished_collisions, vec![CollisionPair::new("a", "c")]);
    assert!(!engine.is_tracked("c"));
    assert!(engine.overlapping("a").is_empty());
    assert!(engine.is_symmetric());
}

#[test]
fn objects_leaving_collidable_layers_stop_colliding() {
    let mut differ = ItemDiffer::new();
    let mut engine = CollisionEngine::new();
    engine.update(&differ.update(&[piece("a", 0.0, 0.0, 1), piece("b", 5.0, 0.0, 1)]));

    let mut note = piece("b", 5.0, 0.0, 2);
    note.layer = "NOTE".to_string();
    let update = engine.update(&differ.update(&[piece("a", 0.0, 0.0, 1), note]));

    assert_eq!(update.finished_collisions, vec![CollisionPair::new("a", "b")]);
    assert!(!engine.is_tracked("b"));
    assert_eq!(engine.tracked_len(), 1);
}

#[test]
fn pairs_are_normalised() {
    let pair = CollisionPair::new("z", "a");
    assert_eq!(pair.a, "a");
    assert_eq!(pair.b, "z");
    assert_eq!(pair, CollisionPair::new("a", "z"));
    assert!(pair.involves("z"));
    assert!(!pair.involves("m"));
}
