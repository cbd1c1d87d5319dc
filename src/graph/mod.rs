//! Serialized block graphs.
//!
//! A graph is a forest of [`BlockNode`]s. The nested form mirrors the editor's
//! tree directly; the flat form (see [`flat`]) stores one record per block
//! with a parent pointer and is what gets persisted on objects.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

pub mod flat;
pub mod hash;
pub mod record;

#[cfg(test)]
mod flat_test;

pub use flat::{FlatGraph, FlatNode, ParentLink};
pub use hash::{content_hash, payload_hash, to_hex};
pub use record::{BehaviorRecord, RecordStamp, SerializedGraph};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("malformed graph json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate block id `{0}`")]
    DuplicateId(String),
    #[error("block `{child}` points at unknown parent `{parent}`")]
    UnknownParent { child: String, parent: String },
    #[error("slot `{slot}` of block `{parent}` is claimed by both `{first}` and `{second}`")]
    SlotConflict {
        parent: String,
        slot: String,
        first: String,
        second: String,
    },
    #[error("block `{0}` is not reachable from any top-level block")]
    Unreachable(String),
}

/// Nested representation of an authored graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockGraph {
    #[serde(default)]
    pub blocks: Vec<BlockNode>,
}

/// One instruction block.
///
/// `inputs` holds value and statement slots; an absent key is an empty slot.
/// `next` links the following statement in a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, Json>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, BlockNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<BlockNode>>,
}

impl BlockGraph {
    pub fn new(blocks: Vec<BlockNode>) -> Self {
        Self { blocks }
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Total number of blocks in the forest.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(BlockNode::subtree_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockNode {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            fields: IndexMap::new(),
            inputs: IndexMap::new(),
            next: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Json>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn input(mut self, name: impl Into<String>, block: BlockNode) -> Self {
        self.inputs.insert(name.into(), block);
        self
    }

    pub fn then(mut self, next: BlockNode) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Builds a statement chain from `blocks`, linking each to the next.
    pub fn chain(blocks: Vec<BlockNode>) -> Option<BlockNode> {
        let mut head: Option<BlockNode> = None;
        for mut block in blocks.into_iter().rev() {
            block.next = head.map(Box::new);
            head = Some(block);
        }
        head
    }

    /// Field value as text. Numbers and booleans are rendered, `null` is
    /// treated as absent.
    pub fn field_text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Json::Null => None,
            Json::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Iterates this block and every block linked after it.
    pub fn chain_iter(&self) -> ChainIter<'_> {
        ChainIter {
            current: Some(self),
        }
    }

    fn subtree_len(&self) -> usize {
        self.chain_iter()
            .map(|block| {
                1 + block
                    .inputs
                    .values()
                    .map(BlockNode::subtree_len)
                    .sum::<usize>()
            })
            .sum()
    }
}

pub struct ChainIter<'a> {
    current: Option<&'a BlockNode>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a BlockNode;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.current?;
        self.current = block.next.as_deref();
        Some(block)
    }
}
