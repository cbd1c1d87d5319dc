//! Shapes of the data crossing the host boundary: scene objects, the host's
//! object and metadata APIs, and scene-wide resources.

pub mod host;
pub mod memory;
pub mod object;
pub mod resources;

pub use host::{Host, HostError, ObjectFilter, ObjectStore};
pub use memory::MemoryScene;
pub use object::{ObjectId, ObjectKind, SceneObject, TrackedProperty, Vector2};
pub use resources::{SceneResources, SoundDefinition, VariableDeclaration};
