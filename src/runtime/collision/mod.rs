//! Incremental overlap tracking driven by snapshot diffs.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::{runtime::diff::ItemDiff, scene::ObjectId};

pub mod aabb;
pub mod tree;

#[cfg(test)]
mod collision_test;

pub use aabb::Aabb;
pub use tree::AabbTree;

/// Unordered pair of object ids, stored with the smaller id first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    pub a: ObjectId,
    pub b: ObjectId,
}

impl CollisionPair {
    pub fn new(first: &str, second: &str) -> Self {
        let (a, b) = if first <= second {
            (first, second)
        } else {
            (second, first)
        };
        Self {
            a: a.to_string(),
            b: b.to_string(),
        }
    }

    pub fn involves(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionUpdate {
    pub new_collisions: Vec<CollisionPair>,
    pub finished_collisions: Vec<CollisionPair>,
}

impl CollisionUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_collisions.is_empty() && self.finished_collisions.is_empty()
    }
}

#[derive(Default)]
pub struct CollisionEngine {
    tree: AabbTree,
    overlaps: HashMap<ObjectId, HashSet<ObjectId>>,
}

impl CollisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, diff: &ItemDiff) -> CollisionUpdate {
        let mut update = CollisionUpdate::default();

        for id in diff.deleted_sorted() {
            self.forget(id, &mut update.finished_collisions);
        }

        // Index every moved object first so each query below sees the final
        // positions of this batch.
        let mut moved = Vec::new();
        for object in diff.touched() {
            if object.is_collidable() {
                let aabb = Aabb::from_object(object);
                self.tree.insert(object.id.clone(), aabb);
                moved.push((object.id.as_str(), aabb));
            } else {
                self.forget(&object.id, &mut update.finished_collisions);
            }
        }

        for (id, aabb) in moved {
            let mut neighbours: Vec<ObjectId> = self
                .tree
                .query(&aabb)
                .into_iter()
                .filter(|other| other != id)
                .collect();
            neighbours.sort();
            let current: HashSet<&ObjectId> = neighbours.iter().collect();

            let mut ended: Vec<ObjectId> = self
                .overlaps
                .get(id)
                .map(|previous| {
                    previous
                        .iter()
                        .filter(|other| !current.contains(other))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            ended.sort();

            for other in &neighbours {
                if self.link(id, other) {
                    update.new_collisions.push(CollisionPair::new(id, other));
                }
            }
            for other in &ended {
                self.unlink(id, other);
                update.finished_collisions.push(CollisionPair::new(id, other));
            }
        }

        if !update.is_empty() {
            trace!(
                started = update.new_collisions.len(),
                finished = update.finished_collisions.len(),
                "collision update"
            );
        }
        update
    }

    /// Ids currently overlapping `id`, sorted.
    pub fn overlapping(&self, id: &str) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self
            .overlaps
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn is_touching(&self, a: &str, b: &str) -> bool {
        self.overlaps.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.tree.contains(id)
    }

    pub fn query(&self, aabb: &Aabb) -> Vec<ObjectId> {
        self.tree.query(aabb)
    }

    pub fn tracked_len(&self) -> usize {
        self.tree.len()
    }

    /// True when every recorded overlap is mirrored on the other side.
    pub fn is_symmetric(&self) -> bool {
        self.overlaps.iter().all(|(id, others)| {
            others
                .iter()
                .all(|other| self.overlaps.get(other).is_some_and(|set| set.contains(id)))
        })
    }

    pub fn clear(&mut self) {
        self.tree = AabbTree::new();
        self.overlaps.clear();
    }

    fn link(&mut self, a: &str, b: &str) -> bool {
        let inserted = self
            .overlaps
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.overlaps
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        inserted
    }

    fn unlink(&mut self, a: &str, b: &str) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(set) = self.overlaps.get_mut(from) {
                set.remove(to);
                if set.is_empty() {
                    self.overlaps.remove(from);
                }
            }
        }
    }

    fn forget(&mut self, id: &str, finished: &mut Vec<CollisionPair>) {
        self.tree.remove(id);
        let Some(others) = self.overlaps.remove(id) else {
            return;
        };
        let mut others: Vec<_> = others.into_iter().collect();
        others.sort();
        for other in others {
            if let Some(set) = self.overlaps.get_mut(&other) {
                set.remove(id);
                if set.is_empty() {
                    self.overlaps.remove(&other);
                }
            }
            finished.push(CollisionPair::new(id, &other));
        }
    }
}
