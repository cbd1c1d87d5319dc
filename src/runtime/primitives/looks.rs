use crate::{
    ir::ZOrder,
    runtime::{error::ExecResult, interpreter::ExecutionContext, value::Value},
    scene::ObjectFilter,
};

use super::helpers::{current, mutate_self, number_arg};

pub async fn set_visible(ctx: &ExecutionContext, visible: bool) -> ExecResult<()> {
    mutate_self(ctx, move |object| object.visible = visible).await
}

/// `size` is a percentage of the unscaled footprint.
pub async fn set_size(ctx: &ExecutionContext, size: &Value) -> ExecResult<()> {
    let scale = (number_arg("setSize", size) / 100.0).max(0.0);
    mutate_self(ctx, move |object| {
        object.scale.x = scale;
        object.scale.y = scale;
    })
    .await
}

pub async fn change_size(ctx: &ExecutionContext, by: &Value) -> ExecResult<()> {
    let delta = number_arg("changeSize", by) / 100.0;
    mutate_self(ctx, move |object| {
        object.scale.x = (object.scale.x + delta).max(0.0);
        object.scale.y = (object.scale.y + delta).max(0.0);
    })
    .await
}

pub async fn set_text(ctx: &ExecutionContext, text: &Value) -> ExecResult<()> {
    let text = text.to_string();
    mutate_self(ctx, move |object| object.text = text.clone()).await
}

pub async fn set_layer(ctx: &ExecutionContext, layer: &str) -> ExecResult<()> {
    let layer = layer.to_string();
    mutate_self(ctx, move |object| object.layer = layer.clone()).await
}

pub async fn set_locked(ctx: &ExecutionContext, locked: bool) -> ExecResult<()> {
    mutate_self(ctx, move |object| object.locked = locked).await
}

/// Moves the object above or below everything else on its layer.
pub async fn arrange(ctx: &ExecutionContext, order: ZOrder) -> ExecResult<()> {
    let me = current(ctx).await?;
    let filter = ObjectFilter::Layer(me.layer.clone());
    let siblings = ctx.services().proxy.get_all(Some(&filter)).await?;
    ctx.token.check()?;

    let others = siblings
        .iter()
        .filter(|object| object.id != me.id)
        .map(|object| object.z_index);
    let z_index = match order {
        ZOrder::Front => others.fold(me.z_index, f64::max) + 1.0,
        ZOrder::Back => others.fold(me.z_index, f64::min) - 1.0,
    };
    mutate_self(ctx, move |object| object.z_index = z_index).await
}
