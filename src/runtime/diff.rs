//! Snapshot differ.
//!
//! Classifies every id of two consecutive snapshots into created, updated or
//! deleted by identity and the per-object modification counter. An id whose
//! counter did not move appears in none of the three.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::{
    runtime::value::Value,
    scene::{ObjectId, SceneObject, TrackedProperty},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub previous: SceneObject,
    pub current: SceneObject,
}

impl ItemUpdate {
    pub fn id(&self) -> &ObjectId {
        &self.current.id
    }

    /// Tracked properties whose value differs, with the new value.
    pub fn changed_properties(&self) -> Vec<(TrackedProperty, Value)> {
        TrackedProperty::ALL
            .iter()
            .filter_map(|&property| {
                let now = self.current.property(property);
                (self.previous.property(property) != now).then_some((property, now))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDiff {
    pub created: Vec<SceneObject>,
    pub updated: Vec<ItemUpdate>,
    pub deleted: HashSet<ObjectId>,
}

impl ItemDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Created and updated objects in their current state.
    pub fn touched(&self) -> impl Iterator<Item = &SceneObject> {
        self.created
            .iter()
            .chain(self.updated.iter().map(|update| &update.current))
    }

    /// Deleted ids in a stable order.
    pub fn deleted_sorted(&self) -> Vec<&ObjectId> {
        let mut ids: Vec<_> = self.deleted.iter().collect();
        ids.sort();
        ids
    }
}

#[derive(Default)]
pub struct ItemDiffer {
    previous: HashMap<ObjectId, SceneObject>,
}

impl ItemDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs `snapshot` against the last one and remembers it. If an id
    /// repeats inside `snapshot` the last occurrence wins.
    pub fn update(&mut self, snapshot: &[SceneObject]) -> ItemDiff {
        let mut current: IndexMap<&str, &SceneObject> = IndexMap::with_capacity(snapshot.len());
        for object in snapshot {
            current.insert(object.id.as_str(), object);
        }

        let mut diff = ItemDiff::default();
        for (id, object) in &current {
            match self.previous.get(*id) {
                None => diff.created.push((*object).clone()),
                Some(previous) if previous.last_modified != object.last_modified => {
                    diff.updated.push(ItemUpdate {
                        previous: previous.clone(),
                        current: (*object).clone(),
                    });
                }
                Some(_) => {}
            }
        }
        for id in self.previous.keys() {
            if !current.contains_key(id.as_str()) {
                diff.deleted.insert(id.clone());
            }
        }

        self.previous = current
            .into_iter()
            .map(|(id, object)| (id.to_string(), object.clone()))
            .collect();
        diff
    }

    pub fn get(&self, id: &str) -> Option<&SceneObject> {
        self.previous.get(id)
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}
