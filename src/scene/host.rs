use async_trait::async_trait;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use super::{
    object::{ObjectId, SceneObject},
    resources::SoundDefinition,
};

/// Failure reported by the host platform.
///
/// `Clone` because a single failed batch is reported to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),
    #[error("host rejected the request: {0}")]
    Rejected(String),
    #[error("host is unavailable")]
    Unavailable,
}

/// Narrows a `get_objects` query.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectFilter {
    Ids(Vec<ObjectId>),
    AttachedTo(ObjectId),
    Layer(String),
}

impl ObjectFilter {
    pub fn matches(&self, object: &SceneObject) -> bool {
        match self {
            ObjectFilter::Ids(ids) => ids.iter().any(|id| *id == object.id),
            ObjectFilter::AttachedTo(parent) => object.attached_to.as_deref() == Some(parent),
            ObjectFilter::Layer(layer) => object.layer == *layer,
        }
    }
}

/// The host's object API. Behaviors never call `update_objects` directly;
/// writes go through [`crate::runtime::proxy::MutationProxy`].
#[async_trait(?Send)]
pub trait ObjectStore {
    async fn get_objects(&self, filter: Option<&ObjectFilter>)
    -> Result<Vec<SceneObject>, HostError>;

    /// Applies `mutator` to every object named in `ids` as one batched write.
    async fn update_objects(
        &self,
        ids: &[ObjectId],
        mutator: &mut dyn for<'m> FnMut(&'m mut SceneObject),
    ) -> Result<(), HostError>;

    async fn delete_objects(&self, ids: &[ObjectId]) -> Result<(), HostError>;

    async fn add_objects(&self, objects: Vec<SceneObject>) -> Result<(), HostError>;
}

/// Everything else the runtime needs from the host: scene metadata, media and
/// user notifications.
#[async_trait(?Send)]
pub trait Host {
    async fn scene_metadata(&self) -> Result<Map<String, Json>, HostError>;

    async fn set_scene_metadata(&self, update: Map<String, Json>) -> Result<(), HostError>;

    /// Resolves once playback has finished.
    async fn play_sound(&self, sound: &SoundDefinition) -> Result<(), HostError>;

    fn stop_sounds(&self);

    /// Best-effort user-visible notification.
    fn notify(&self, message: &str);
}
