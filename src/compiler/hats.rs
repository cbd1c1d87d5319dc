//! Hat translation: captures each entry point's matching criteria from its
//! static fields.

use indexmap::IndexMap;

use crate::{
    graph::BlockNode,
    ir::{
        CollisionPhase, DICE_ROLL_SIGNAL, DOOR_SIGNAL, PHASE_CHANGED_SIGNAL, TriggerKind,
        ValueMatch,
    },
    runtime::value::Value,
    scene::TrackedProperty,
};

use super::{CompileError, CompileResult, Compiler};

pub(super) fn broadcast(block: &BlockNode) -> CompileResult<TriggerKind> {
    let name = Compiler::required_field(block, "BROADCAST_OPTION")?;
    Ok(TriggerKind::Broadcast { name })
}

fn tracked_property(block: &BlockNode) -> CompileResult<TrackedProperty> {
    let raw = Compiler::required_field(block, "PROPERTY")?;
    TrackedProperty::parse(&raw).ok_or_else(|| CompileError::invalid_field(block, "PROPERTY", &raw))
}

pub(super) fn property_changed(block: &BlockNode) -> CompileResult<TriggerKind> {
    Ok(TriggerKind::PropertyChanged {
        property: tracked_property(block)?,
        matcher: ValueMatch::Any,
    })
}

pub(super) fn property_becomes(block: &BlockNode) -> CompileResult<TriggerKind> {
    let property = tracked_property(block)?;
    let literal = block.field_text("VALUE").unwrap_or_default();
    let value = property
        .typed_literal(&literal)
        .ok_or_else(|| CompileError::invalid_field(block, "VALUE", &literal))?;
    Ok(TriggerKind::PropertyChanged {
        property,
        matcher: ValueMatch::Exactly(value),
    })
}

pub(super) fn attached() -> TriggerKind {
    TriggerKind::PropertyChanged {
        property: TrackedProperty::AttachedTo,
        matcher: ValueMatch::Defined,
    }
}

pub(super) fn detached() -> TriggerKind {
    TriggerKind::PropertyChanged {
        property: TrackedProperty::AttachedTo,
        matcher: ValueMatch::Exactly(Value::Nothing),
    }
}

pub(super) fn selection(block: &BlockNode) -> CompileResult<TriggerKind> {
    let raw = Compiler::required_field(block, "STATE")?;
    let selected = match raw.as_str() {
        "SELECTED" => true,
        "DESELECTED" => false,
        _ => return Err(CompileError::invalid_field(block, "STATE", &raw)),
    };
    Ok(TriggerKind::SelectionChanged { selected })
}

pub(super) fn touching(block: &BlockNode) -> CompileResult<TriggerKind> {
    let raw = Compiler::required_field(block, "STATE")?;
    let phase = match raw.as_str() {
        "START" => CollisionPhase::Start,
        "END" => CollisionPhase::End,
        _ => return Err(CompileError::invalid_field(block, "STATE", &raw)),
    };
    Ok(TriggerKind::Collision { phase })
}

fn is_wildcard(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("ANY")
}

pub(super) fn dice_roll(block: &BlockNode) -> CompileResult<TriggerKind> {
    let die = block.field_text("DIE").unwrap_or_default();
    let value = block.field_text("VALUE").unwrap_or_default();

    let mut criteria = IndexMap::new();
    let die_match = if is_wildcard(&die) {
        ValueMatch::Any
    } else {
        ValueMatch::Exactly(Value::text(die.trim()))
    };
    criteria.insert("die".to_string(), die_match);

    let value_match = if is_wildcard(&value) {
        ValueMatch::Any
    } else {
        match value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => ValueMatch::Exactly(Value::Number(n)),
            _ => return Err(CompileError::invalid_field(block, "VALUE", &value)),
        }
    };
    criteria.insert("value".to_string(), value_match);

    Ok(TriggerKind::External {
        signal: DICE_ROLL_SIGNAL.to_string(),
        criteria,
    })
}

pub(super) fn phase_changed(block: &BlockNode) -> CompileResult<TriggerKind> {
    let name = Compiler::required_field(block, "PHASE_NAME")?;
    let value = block.field_text("VALUE").unwrap_or_default();

    let value_match = if value.trim().is_empty() {
        ValueMatch::Any
    } else {
        match value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => ValueMatch::Exactly(Value::Number(n)),
            _ => ValueMatch::Exactly(Value::text(&value)),
        }
    };

    let mut criteria = IndexMap::new();
    criteria.insert("name".to_string(), ValueMatch::Exactly(Value::text(&name)));
    criteria.insert("value".to_string(), value_match);
    Ok(TriggerKind::External {
        signal: PHASE_CHANGED_SIGNAL.to_string(),
        criteria,
    })
}

pub(super) fn door(block: &BlockNode) -> CompileResult<TriggerKind> {
    let raw = Compiler::required_field(block, "STATE")?;
    let state = match raw.as_str() {
        "OPEN" => "open",
        "CLOSED" => "closed",
        _ => return Err(CompileError::invalid_field(block, "STATE", &raw)),
    };
    let mut criteria = IndexMap::new();
    criteria.insert("state".to_string(), ValueMatch::Exactly(Value::text(state)));
    Ok(TriggerKind::External {
        signal: DOOR_SIGNAL.to_string(),
        criteria,
    })
}
