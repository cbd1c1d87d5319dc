use crate::{
    graph::BlockNode,
    ir::{Expr, VarRef},
    runtime::value::Value,
};

use super::{CompileError, CompileResult, Compiler, Rule, rule_for};

impl Compiler {
    pub(super) fn compile_expression(&mut self, block: &BlockNode) -> CompileResult<Expr> {
        match rule_for(Self::kind_of(block)?) {
            Rule::Reporter(rule) => rule(self, block),
            Rule::Statement(_) | Rule::Hat(_) => Err(CompileError::misplaced(block, "a value")),
        }
    }

    fn slot(&mut self, block: &BlockNode, name: &str, empty: Value) -> CompileResult<Expr> {
        match block.inputs.get(name) {
            Some(child) => self.compile_expression(child),
            None => Ok(Expr::Literal(empty)),
        }
    }

    pub(super) fn number_input(&mut self, block: &BlockNode, name: &str) -> CompileResult<Expr> {
        self.slot(block, name, Value::Number(0.0))
    }

    pub(super) fn text_input(&mut self, block: &BlockNode, name: &str) -> CompileResult<Expr> {
        self.slot(block, name, Value::text(""))
    }

    pub(super) fn bool_input(&mut self, block: &BlockNode, name: &str) -> CompileResult<Expr> {
        self.slot(block, name, Value::Bool(false))
    }

    pub(super) fn boxed_number(
        &mut self,
        block: &BlockNode,
        name: &str,
    ) -> CompileResult<Box<Expr>> {
        self.number_input(block, name).map(Box::new)
    }

    pub(super) fn boxed_text(&mut self, block: &BlockNode, name: &str) -> CompileResult<Box<Expr>> {
        self.text_input(block, name).map(Box::new)
    }

    pub(super) fn boxed_bool(&mut self, block: &BlockNode, name: &str) -> CompileResult<Box<Expr>> {
        self.bool_input(block, name).map(Box::new)
    }

    pub(super) fn required_field(block: &BlockNode, name: &'static str) -> CompileResult<String> {
        block
            .field_text(name)
            .ok_or_else(|| CompileError::missing_field(block, name))
    }

    pub(super) fn variable(&mut self, block: &BlockNode) -> CompileResult<VarRef> {
        let id = Self::required_field(block, "VARIABLE")?;
        if id.is_empty() {
            return Err(CompileError::invalid_field(block, "VARIABLE", &id));
        }
        Ok(self.resolve_variable(&id))
    }
}

/// `NUM` field of a numeric literal block, through the to-finite-number rule.
pub(super) fn number_literal(block: &BlockNode) -> Expr {
    let raw = block
        .fields
        .get("NUM")
        .map(Value::from_json)
        .unwrap_or_default();
    Expr::number(raw.to_number())
}

pub(super) fn text_literal(block: &BlockNode) -> Expr {
    Expr::text(&block.field_text("TEXT").unwrap_or_default())
}

pub(super) fn boolean_literal(block: &BlockNode) -> CompileResult<Expr> {
    let raw = Compiler::required_field(block, "BOOL")?;
    match raw.to_ascii_uppercase().as_str() {
        "TRUE" => Ok(Expr::boolean(true)),
        "FALSE" => Ok(Expr::boolean(false)),
        _ => Err(CompileError::invalid_field(block, "BOOL", &raw)),
    }
}

/// Menu shadow blocks carry their selection as a single text field.
pub(super) fn menu_literal(block: &BlockNode, field: &'static str) -> CompileResult<Expr> {
    Compiler::required_field(block, field).map(|value| Expr::text(&value))
}
