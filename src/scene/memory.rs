//! In-memory host used by the CLI simulator and the test suites.

use std::{cell::RefCell, time::Duration};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use tokio::sync::mpsc;

use super::{
    host::{Host, HostError, ObjectFilter, ObjectStore},
    object::{ObjectId, SceneObject},
    resources::SoundDefinition,
};

#[derive(Default)]
struct MemoryState {
    objects: IndexMap<ObjectId, SceneObject>,
    metadata: Map<String, Json>,
    update_calls: Vec<Vec<ObjectId>>,
    fail_next_update: Option<HostError>,
    notifications: Vec<String>,
    played_sounds: Vec<String>,
    sound_stops: usize,
    next_modified: u64,
    watchers: Vec<mpsc::UnboundedSender<Vec<SceneObject>>>,
}

impl MemoryState {
    /// Pushes the full snapshot to every live subscriber.
    fn publish(&mut self) {
        if self.watchers.is_empty() {
            return;
        }
        let snapshot: Vec<SceneObject> = self.objects.values().cloned().collect();
        self.watchers
            .retain(|watcher| watcher.send(snapshot.clone()).is_ok());
    }
}

/// A scene that lives entirely in memory and records every batched write.
#[derive(Default)]
pub struct MemoryScene {
    state: RefCell<MemoryState>,
    sound_duration: Duration,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: impl IntoIterator<Item = SceneObject>) -> Self {
        let scene = Self::new();
        scene.insert_all(objects);
        scene
    }

    pub fn with_sound_duration(mut self, duration: Duration) -> Self {
        self.sound_duration = duration;
        self
    }

    fn insert_all(&self, objects: impl IntoIterator<Item = SceneObject>) {
        let mut state = self.state.borrow_mut();
        for mut object in objects {
            state.next_modified += 1;
            object.last_modified = object.last_modified.max(state.next_modified);
            state.objects.insert(object.id.clone(), object);
        }
        state.publish();
    }

    /// Change notifications: every write yields the full current snapshot.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<SceneObject>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.borrow_mut().watchers.push(tx);
        rx
    }

    /// Current full snapshot, in insertion order.
    pub fn snapshot(&self) -> Vec<SceneObject> {
        self.state.borrow().objects.values().cloned().collect()
    }

    pub fn object(&self, id: &str) -> Option<SceneObject> {
        self.state.borrow().objects.get(id).cloned()
    }

    /// Applies a write as if it came from another client, bumping the
    /// modification counter.
    pub fn edit(&self, id: &str, edit: impl FnOnce(&mut SceneObject)) {
        let mut state = self.state.borrow_mut();
        state.next_modified += 1;
        let stamp = state.next_modified;
        if let Some(object) = state.objects.get_mut(id) {
            edit(object);
            object.last_modified = stamp;
        }
        state.publish();
    }

    pub fn remove(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        state.objects.shift_remove(id);
        state.publish();
    }

    pub fn set_metadata(&self, key: &str, value: Json) {
        self.state
            .borrow_mut()
            .metadata
            .insert(key.to_string(), value);
    }

    /// Ids touched by each `update_objects` call, in call order.
    pub fn update_calls(&self) -> Vec<Vec<ObjectId>> {
        self.state.borrow().update_calls.clone()
    }

    pub fn fail_next_update(&self, error: HostError) {
        self.state.borrow_mut().fail_next_update = Some(error);
    }

    pub fn notifications(&self) -> Vec<String> {
        self.state.borrow().notifications.clone()
    }

    pub fn played_sounds(&self) -> Vec<String> {
        self.state.borrow().played_sounds.clone()
    }

    pub fn sound_stops(&self) -> usize {
        self.state.borrow().sound_stops
    }
}

#[async_trait(?Send)]
impl ObjectStore for MemoryScene {
    async fn get_objects(
        &self,
        filter: Option<&ObjectFilter>,
    ) -> Result<Vec<SceneObject>, HostError> {
        let state = self.state.borrow();
        Ok(state
            .objects
            .values()
            .filter(|object| filter.is_none_or(|f| f.matches(object)))
            .cloned()
            .collect())
    }

    async fn update_objects(
        &self,
        ids: &[ObjectId],
        mutator: &mut dyn for<'m> FnMut(&'m mut SceneObject),
    ) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        state.update_calls.push(ids.to_vec());
        if let Some(err) = state.fail_next_update.take() {
            return Err(err);
        }
        for id in ids {
            state.next_modified += 1;
            let stamp = state.next_modified;
            if let Some(object) = state.objects.get_mut(id) {
                mutator(object);
                object.last_modified = stamp;
            }
        }
        state.publish();
        Ok(())
    }

    async fn delete_objects(&self, ids: &[ObjectId]) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        for id in ids {
            state.objects.shift_remove(id);
        }
        state.publish();
        Ok(())
    }

    async fn add_objects(&self, objects: Vec<SceneObject>) -> Result<(), HostError> {
        self.insert_all(objects);
        Ok(())
    }
}

#[async_trait(?Send)]
impl Host for MemoryScene {
    async fn scene_metadata(&self) -> Result<Map<String, Json>, HostError> {
        Ok(self.state.borrow().metadata.clone())
    }

    async fn set_scene_metadata(&self, update: Map<String, Json>) -> Result<(), HostError> {
        self.state.borrow_mut().metadata.extend(update);
        Ok(())
    }

    async fn play_sound(&self, sound: &SoundDefinition) -> Result<(), HostError> {
        self.state
            .borrow_mut()
            .played_sounds
            .push(sound.name.clone());
        if !self.sound_duration.is_zero() {
            tokio::time::sleep(self.sound_duration).await;
        }
        Ok(())
    }

    fn stop_sounds(&self) {
        self.state.borrow_mut().sound_stops += 1;
    }

    fn notify(&self, message: &str) {
        self.state
            .borrow_mut()
            .notifications
            .push(message.to_string());
    }
}
