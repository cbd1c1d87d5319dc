//! Flat parent-pointer representation.
//!
//! Every block is one record; `p` names its parent: a bare id for membership
//! in the parent's `next` chain, `[id, input]` for membership in an input
//! slot. Top-level blocks have no `p`. Records are written in pre-order
//! (block, its inputs, then its successor), which is what makes the
//! conversion back to the nested form order-preserving.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::{BlockGraph, BlockNode, GraphError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentLink {
    Next(String),
    Input(String, String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<ParentLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatGraph {
    pub nodes: Vec<FlatNode>,
}

impl FlatGraph {
    pub fn from_graph(graph: &BlockGraph) -> Self {
        let mut nodes = Vec::with_capacity(graph.len());
        for root in &graph.blocks {
            flatten_chain(root, None, &mut nodes);
        }
        Self { nodes }
    }

    pub fn to_graph(&self) -> Result<BlockGraph, GraphError> {
        Inflater::new(&self.nodes)?.inflate()
    }
}

fn flatten_chain(head: &BlockNode, parent: Option<ParentLink>, out: &mut Vec<FlatNode>) {
    let mut link = parent;
    for block in head.chain_iter() {
        out.push(FlatNode {
            id: block.id.clone(),
            kind: block.kind.clone(),
            fields: block.fields.clone(),
            p: link.take(),
        });
        for (slot, child) in &block.inputs {
            flatten_chain(
                child,
                Some(ParentLink::Input(block.id.clone(), slot.clone())),
                out,
            );
        }
        link = Some(ParentLink::Next(block.id.clone()));
    }
}

struct Inflater<'a> {
    nodes: &'a [FlatNode],
    next_of: HashMap<usize, usize>,
    inputs_of: HashMap<usize, Vec<(&'a str, usize)>>,
    roots: Vec<usize>,
    visited: Vec<bool>,
}

impl<'a> Inflater<'a> {
    fn new(nodes: &'a [FlatNode]) -> Result<Self, GraphError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.as_str(), i).is_some() {
                return Err(GraphError::DuplicateId(node.id.clone()));
            }
        }

        let mut next_of = HashMap::new();
        let mut inputs_of: HashMap<usize, Vec<(&str, usize)>> = HashMap::new();
        let mut roots = Vec::new();

        for (i, node) in nodes.iter().enumerate() {
            let Some(link) = &node.p else {
                roots.push(i);
                continue;
            };
            let parent_id = match link {
                ParentLink::Next(parent) | ParentLink::Input(parent, _) => parent,
            };
            let parent = *index
                .get(parent_id.as_str())
                .ok_or_else(|| GraphError::UnknownParent {
                    child: node.id.clone(),
                    parent: parent_id.clone(),
                })?;

            match link {
                ParentLink::Next(_) => {
                    if let Some(&existing) = next_of.get(&parent) {
                        return Err(slot_conflict(nodes, parent, "next", existing, i));
                    }
                    next_of.insert(parent, i);
                }
                ParentLink::Input(_, slot) => {
                    let slots = inputs_of.entry(parent).or_default();
                    let claimed = slots.iter().find(|(name, _)| *name == slot.as_str());
                    if let Some(&(_, existing)) = claimed {
                        return Err(slot_conflict(nodes, parent, slot, existing, i));
                    }
                    slots.push((slot.as_str(), i));
                }
            }
        }

        Ok(Self {
            nodes,
            next_of,
            inputs_of,
            roots,
            visited: vec![false; nodes.len()],
        })
    }

    fn inflate(mut self) -> Result<BlockGraph, GraphError> {
        let roots = std::mem::take(&mut self.roots);
        let blocks = roots.into_iter().map(|root| self.build_chain(root)).collect();

        if let Some(orphan) = self.visited.iter().position(|seen| !seen) {
            return Err(GraphError::Unreachable(self.nodes[orphan].id.clone()));
        }
        Ok(BlockGraph { blocks })
    }

    fn build_chain(&mut self, head: usize) -> BlockNode {
        let mut members = vec![head];
        let mut cursor = head;
        while let Some(&next) = self.next_of.get(&cursor) {
            members.push(next);
            cursor = next;
        }

        let mut built: Option<BlockNode> = None;
        for index in members.into_iter().rev() {
            let mut block = self.build_single(index);
            block.next = built.map(Box::new);
            built = Some(block);
        }
        // `members` always holds at least `head`.
        built.unwrap_or_else(|| self.build_single(head))
    }

    fn build_single(&mut self, index: usize) -> BlockNode {
        self.visited[index] = true;
        let nodes = self.nodes;
        let node = &nodes[index];
        let mut block = BlockNode::new(node.id.clone(), node.kind.clone());
        block.fields = node.fields.clone();

        let slots = self.inputs_of.get(&index).cloned().unwrap_or_default();
        for (slot, child) in slots {
            let child_block = self.build_chain(child);
            block.inputs.insert(slot.to_string(), child_block);
        }
        block
    }
}

fn slot_conflict(
    nodes: &[FlatNode],
    parent: usize,
    slot: &str,
    first: usize,
    second: usize,
) -> GraphError {
    GraphError::SlotConflict {
        parent: nodes[parent].id.clone(),
        slot: slot.to_string(),
        first: nodes[first].id.clone(),
        second: nodes[second].id.clone(),
    }
}
