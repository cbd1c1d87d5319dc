//! Block graph → [`CompiledProcedure`] translation.
//!
//! Only top-level hat blocks (a hat kind with a successor) are translated;
//! everything else at the top level is skipped. Each hat becomes one handler
//! whose matching criteria are captured from its fields here, so the registry
//! can match events without touching the body.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    graph::{BlockGraph, BlockNode, content_hash},
    ir::{CompiledHandler, CompiledProcedure, HandlerDescriptor, VarRef},
};

pub mod cache;
mod catalog;
mod errors;
mod expression;
mod hats;
mod rules;
mod statement;

#[cfg(test)]
mod compiler_test;

pub use cache::ProcedureCache;
pub use catalog::BlockKind;
pub use errors::CompileError;
pub use rules::{Rule, rule_for};

pub type CompileResult<T> = Result<T, CompileError>;

/// Inputs to compilation beyond the graph itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Variable ids that resolve to the scene-shared map instead of a local
    /// slot.
    pub global_variables: BTreeSet<String>,
}

impl CompileOptions {
    pub fn with_globals<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            global_variables: ids.into_iter().map(Into::into).collect(),
        }
    }

    fn salt(&self) -> Vec<&str> {
        self.global_variables.iter().map(String::as_str).collect()
    }

    pub fn hash_graph(&self, graph: &BlockGraph) -> [u8; 32] {
        content_hash(graph, &self.salt())
    }
}

pub struct Compiler {
    options: CompileOptions,
    locals: IndexMap<String, usize>,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            locals: IndexMap::new(),
        }
    }

    pub fn compile(&mut self, graph: &BlockGraph) -> CompileResult<CompiledProcedure> {
        self.locals.clear();
        let mut handlers = Vec::new();

        for top in &graph.blocks {
            let kind = Self::kind_of(top)?;
            let Rule::Hat(hat_rule) = rule_for(kind) else {
                trace!(block = %top.id, kind = %top.kind, "skipping top-level non-hat block");
                continue;
            };
            let Some(first) = top.next.as_deref() else {
                trace!(block = %top.id, "skipping hat without a body");
                continue;
            };

            let trigger = hat_rule(self, top)?;
            let body = self.compile_chain(first)?;
            debug!(hat = %top.id, trigger = %trigger, statements = body.len(), "compiled handler");
            handlers.push(CompiledHandler {
                descriptor: HandlerDescriptor {
                    hat_id: top.id.clone(),
                    kind: trigger,
                },
                body: body.into(),
            });
        }

        Ok(CompiledProcedure {
            handlers,
            locals: self.locals.keys().cloned().collect(),
            hash: self.options.hash_graph(graph),
        })
    }

    pub(super) fn kind_of(block: &BlockNode) -> CompileResult<BlockKind> {
        BlockKind::parse(&block.kind).ok_or_else(|| CompileError::unknown(block))
    }

    pub(super) fn resolve_variable(&mut self, id: &str) -> VarRef {
        if self.options.global_variables.contains(id) {
            return VarRef::Global(id.into());
        }
        let next = self.locals.len();
        VarRef::Local(*self.locals.entry(id.to_string()).or_insert(next))
    }
}

/// One-shot compilation with fresh state.
pub fn compile(graph: &BlockGraph, options: &CompileOptions) -> CompileResult<CompiledProcedure> {
    Compiler::new(options.clone()).compile(graph)
}
