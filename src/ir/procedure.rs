use std::rc::Rc;

use crate::graph::to_hex;

use super::{
    stmt::Stmt,
    trigger::{HandlerDescriptor, TriggerKind},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledHandler {
    pub descriptor: HandlerDescriptor,
    pub body: Rc<[Stmt]>,
}

/// Result of compiling one object's graph.
///
/// Handlers are kept in hat declaration order; dispatch follows that order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProcedure {
    pub handlers: Vec<CompiledHandler>,
    /// Local variable ids by slot.
    pub locals: Vec<String>,
    pub hash: [u8; 32],
}

impl CompiledProcedure {
    /// Static descriptors only; enough for the editor to know what an object
    /// reacts to.
    pub fn descriptors(&self) -> Vec<HandlerDescriptor> {
        self.handlers.iter().map(|h| h.descriptor.clone()).collect()
    }

    /// Handlers that run once right after installation.
    pub fn immediate(&self) -> impl Iterator<Item = &CompiledHandler> {
        self.handlers
            .iter()
            .filter(|h| matches!(h.descriptor.kind, TriggerKind::Immediately))
    }

    pub fn handler(&self, hat_id: &str) -> Option<&CompiledHandler> {
        self.handlers.iter().find(|h| h.descriptor.hat_id == hat_id)
    }

    pub fn hash_hex(&self) -> String {
        to_hex(&self.hash)
    }
}
