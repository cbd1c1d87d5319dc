use thiserror::Error;

use crate::graph::BlockNode;

/// A graph that cannot be translated. Fatal to that one compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("[E101] unknown block type `{kind}` (block `{block}`)")]
    UnknownBlockType { block: String, kind: String },

    #[error("[E102] block `{block}` ({kind}) cannot be used as {expected}")]
    MisplacedBlock {
        block: String,
        kind: String,
        expected: &'static str,
    },

    #[error("[E103] block `{block}` is missing field `{field}`")]
    MissingField { block: String, field: &'static str },

    #[error("[E104] block `{block}` has invalid value `{value}` for field `{field}`")]
    InvalidField {
        block: String,
        field: &'static str,
        value: String,
    },
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnknownBlockType { .. } => "E101",
            CompileError::MisplacedBlock { .. } => "E102",
            CompileError::MissingField { .. } => "E103",
            CompileError::InvalidField { .. } => "E104",
        }
    }

    pub fn block_id(&self) -> &str {
        match self {
            CompileError::UnknownBlockType { block, .. }
            | CompileError::MisplacedBlock { block, .. }
            | CompileError::MissingField { block, .. }
            | CompileError::InvalidField { block, .. } => block,
        }
    }

    pub(super) fn unknown(block: &BlockNode) -> Self {
        CompileError::UnknownBlockType {
            block: block.id.clone(),
            kind: block.kind.clone(),
        }
    }

    pub(super) fn misplaced(block: &BlockNode, expected: &'static str) -> Self {
        CompileError::MisplacedBlock {
            block: block.id.clone(),
            kind: block.kind.clone(),
            expected,
        }
    }

    pub(super) fn missing_field(block: &BlockNode, field: &'static str) -> Self {
        CompileError::MissingField {
            block: block.id.clone(),
            field,
        }
    }

    pub(super) fn invalid_field(block: &BlockNode, field: &'static str, value: &str) -> Self {
        CompileError::InvalidField {
            block: block.id.clone(),
            field,
            value: value.to_string(),
        }
    }
}
