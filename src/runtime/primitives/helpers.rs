use tracing::warn;

use crate::{
    runtime::{
        error::{ExecError, ExecResult},
        interpreter::ExecutionContext,
        value::Value,
    },
    scene::SceneObject,
};

/// Numeric argument of a primitive. Anything that is not a finite number is
/// reported and replaced by 0 so the script keeps going.
pub(super) fn number_arg(primitive: &str, value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => Some(*n),
        Value::Text(s) if s.trim().is_empty() => Some(0.0),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) | Value::Nothing => Some(value.to_number()),
    };
    match parsed {
        Some(n) if n.is_finite() => n,
        _ => {
            warn!(primitive, value = %value, "invalid numeric argument, using 0");
            0.0
        }
    }
}

/// Non-empty text argument; empty input is reported and yields `None`.
pub(super) fn name_arg(primitive: &str, value: &Value) -> Option<String> {
    let text = value.to_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        warn!(primitive, "empty name argument, ignoring");
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Queues a write to the executing object and waits for its flush.
pub(super) async fn mutate_self(
    ctx: &ExecutionContext,
    mutator: impl Fn(&mut SceneObject) + 'static,
) -> ExecResult<()> {
    let handle = ctx
        .services()
        .proxy
        .update(ctx.object_id.clone(), mutator);
    handle.await?;
    ctx.token.check()
}

/// Current state of the executing object.
pub(super) async fn current(ctx: &ExecutionContext) -> ExecResult<SceneObject> {
    let object = ctx.services().proxy.get(&ctx.object_id).await?;
    ctx.token.check()?;
    object.ok_or_else(|| ExecError::MissingObject(ctx.object_id.clone()))
}

/// Another object by id; missing objects are reported, not fatal.
pub(super) async fn lookup(
    ctx: &ExecutionContext,
    primitive: &str,
    id: &Value,
) -> ExecResult<Option<SceneObject>> {
    let Some(id) = name_arg(primitive, id) else {
        return Ok(None);
    };
    let object = ctx.services().proxy.get(&id).await?;
    ctx.token.check()?;
    if object.is_none() {
        warn!(primitive, object = %id, "unknown object");
    }
    Ok(object)
}
