use crate::{
    ir::{ObjectProperty, Sensor},
    runtime::{error::ExecResult, interpreter::ExecutionContext, value::Value},
    scene::SceneObject,
};

use super::helpers::{current, lookup};

/// Sensors that read the executing object or the execution itself.
pub async fn read_own(ctx: &ExecutionContext, sensor: &Sensor) -> ExecResult<Value> {
    let value = match sensor {
        Sensor::OtherObject => ctx
            .other_id
            .as_deref()
            .map(Value::text)
            .unwrap_or_else(|| Value::text("")),
        Sensor::MyId => Value::text(&ctx.object_id),
        Sensor::Timer => Value::Number(ctx.services().started.elapsed().as_secs_f64()),
        Sensor::XPosition => Value::Number(current(ctx).await?.position.x),
        Sensor::YPosition => Value::Number(current(ctx).await?.position.y),
        Sensor::Direction => Value::Number(current(ctx).await?.rotation),
        Sensor::Size => Value::Number(size_percent(&current(ctx).await?)),
        Sensor::Text => Value::text(current(ctx).await?.text),
        Sensor::Visible => Value::Bool(current(ctx).await?.visible),
        Sensor::Touching(_)
        | Sensor::DistanceTo(_)
        | Sensor::PropertyOf { .. }
        | Sensor::HasTag(_) => Value::Nothing,
    };
    Ok(value)
}

fn size_percent(object: &SceneObject) -> f64 {
    object.scale.x * 100.0
}

/// Whether the executing object currently overlaps `target`. An empty
/// target means any object.
pub fn touching(ctx: &ExecutionContext, target: &Value) -> Value {
    let target = target.to_string();
    let collisions = ctx.services().collisions.borrow();
    let touching = if target.trim().is_empty() {
        !collisions.overlapping(&ctx.object_id).is_empty()
    } else {
        collisions.is_touching(&ctx.object_id, target.trim())
    };
    Value::Bool(touching)
}

pub async fn distance_to(ctx: &ExecutionContext, target: &Value) -> ExecResult<Value> {
    let Some(other) = lookup(ctx, "distanceTo", target).await? else {
        return Ok(Value::Number(0.0));
    };
    let me = current(ctx).await?;
    Ok(Value::Number(me.position.distance(other.position)))
}

pub async fn property_of(
    ctx: &ExecutionContext,
    property: ObjectProperty,
    target: &Value,
) -> ExecResult<Value> {
    let Some(other) = lookup(ctx, "propertyOf", target).await? else {
        return Ok(Value::Nothing);
    };
    let value = match property {
        ObjectProperty::X => Value::Number(other.position.x),
        ObjectProperty::Y => Value::Number(other.position.y),
        ObjectProperty::Direction => Value::Number(other.rotation),
        ObjectProperty::Size => Value::Number(size_percent(&other)),
        ObjectProperty::Name => Value::text(&other.name),
        ObjectProperty::Text => Value::text(&other.text),
        ObjectProperty::Layer => Value::text(&other.layer),
        ObjectProperty::Visible => Value::Bool(other.visible),
    };
    Ok(value)
}

pub async fn has_tag(ctx: &ExecutionContext, tag: &Value) -> ExecResult<Value> {
    let tag = tag.to_string();
    Ok(Value::Bool(current(ctx).await?.has_tag(tag.trim())))
}
