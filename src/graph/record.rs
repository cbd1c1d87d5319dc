use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::scene::SceneObject;

use super::{BlockGraph, FlatGraph, GraphError, hash::payload_hash};

/// Either persisted graph representation. The flat form is what the editor
/// writes; the nested form is accepted for hand-written fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedGraph {
    Flat(FlatGraph),
    Nested(BlockGraph),
}

impl SerializedGraph {
    pub fn to_graph(&self) -> Result<BlockGraph, GraphError> {
        match self {
            SerializedGraph::Flat(flat) => flat.to_graph(),
            SerializedGraph::Nested(graph) => Ok(graph.clone()),
        }
    }
}

/// The behavior metadata stored on an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRecord {
    /// Graph version; compilation runs only when this advances.
    pub last_modified: u64,
    pub graph: SerializedGraph,
}

impl BehaviorRecord {
    pub fn new(last_modified: u64, graph: &BlockGraph) -> Self {
        Self {
            last_modified,
            graph: SerializedGraph::Flat(FlatGraph::from_graph(graph)),
        }
    }

    /// Reads the record stored under `key`. `None` when the object carries no
    /// behaviors; `Some(Err(_))` when the stored payload is malformed.
    pub fn from_object(object: &SceneObject, key: &str) -> Option<Result<Self, GraphError>> {
        object.metadata.get(key).map(Self::from_json)
    }

    pub fn from_json(raw: &Json) -> Result<Self, GraphError> {
        Ok(Self::deserialize(raw)?)
    }

    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

/// Identifies one stored record so it is processed once: by its version when
/// `lastModified` is readable, otherwise by a hash of the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStamp {
    Version(u64),
    Payload([u8; 32]),
}

impl RecordStamp {
    pub fn of(raw: &Json) -> Self {
        match raw.get("lastModified").and_then(Json::as_u64) {
            Some(version) => RecordStamp::Version(version),
            None => RecordStamp::Payload(payload_hash(raw)),
        }
    }

    /// Whether a record stamped `self` still needs processing after one
    /// stamped `seen` was handled. Versions only move forward.
    pub fn supersedes(self, seen: RecordStamp) -> bool {
        match (self, seen) {
            (RecordStamp::Version(next), RecordStamp::Version(seen)) => next > seen,
            (next, seen) => next != seen,
        }
    }
}
