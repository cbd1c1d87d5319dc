use crate::{
    graph::BlockNode,
    ir::{BroadcastTarget, Stmt, StopScope},
};

use super::{CompileError, CompileResult, Compiler, Rule, rule_for};

/// Layers an object can be moved to.
const LAYERS: &[&str] = &[
    "MAP",
    "GRID",
    "DRAWING",
    "PROP",
    "MOUNT",
    "CHARACTER",
    "ATTACHMENT",
    "NOTE",
    "TEXT",
];

impl Compiler {
    pub(super) fn compile_chain(&mut self, head: &BlockNode) -> CompileResult<Vec<Stmt>> {
        head.chain_iter()
            .map(|block| self.compile_statement(block))
            .collect()
    }

    pub(super) fn compile_statement(&mut self, block: &BlockNode) -> CompileResult<Stmt> {
        match rule_for(Self::kind_of(block)?) {
            Rule::Statement(rule) => rule(self, block),
            Rule::Reporter(_) | Rule::Hat(_) => {
                Err(CompileError::misplaced(block, "a statement"))
            }
        }
    }

    /// Statement chain held in an input slot (`SUBSTACK`, `SUBSTACK2`).
    pub(super) fn substack(&mut self, block: &BlockNode, name: &str) -> CompileResult<Vec<Stmt>> {
        match block.inputs.get(name) {
            Some(head) => self.compile_chain(head),
            None => Ok(Vec::new()),
        }
    }

    pub(super) fn broadcast_target(&mut self, block: &BlockNode) -> CompileResult<BroadcastTarget> {
        let raw = Self::required_field(block, "TARGET")?;
        match raw.as_str() {
            "SELF" => Ok(BroadcastTarget::OnlySelf),
            "ATTACHMENTS" => Ok(BroadcastTarget::Attachments),
            "OBJECT" => Ok(BroadcastTarget::Object(self.text_input(block, "OBJECT")?)),
            _ => Err(CompileError::invalid_field(block, "TARGET", &raw)),
        }
    }
}

pub(super) fn stop_scope(block: &BlockNode) -> CompileResult<StopScope> {
    let raw = Compiler::required_field(block, "STOP_OPTION")?;
    match raw.as_str() {
        "this script" | "THIS" => Ok(StopScope::ThisScript),
        "other scripts in sprite" | "OTHER" => Ok(StopScope::OtherScriptsOnObject),
        "all" | "ALL" => Ok(StopScope::All),
        _ => Err(CompileError::invalid_field(block, "STOP_OPTION", &raw)),
    }
}

pub(super) fn layer(block: &BlockNode) -> CompileResult<String> {
    let raw = Compiler::required_field(block, "LAYER")?;
    let layer = raw.to_ascii_uppercase();
    if LAYERS.contains(&layer.as_str()) {
        Ok(layer)
    } else {
        Err(CompileError::invalid_field(block, "LAYER", &raw))
    }
}

pub(super) fn locked(block: &BlockNode) -> CompileResult<bool> {
    let raw = Compiler::required_field(block, "LOCKED")?;
    match raw.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(CompileError::invalid_field(block, "LOCKED", &raw)),
    }
}
