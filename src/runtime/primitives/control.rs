use std::time::Duration;

use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::runtime::{
    error::ExecResult,
    interpreter::{ExecutionContext, Flow},
    value::Value,
};

use super::helpers::{current, number_arg};

pub async fn wait(ctx: &ExecutionContext, seconds: &Value) -> ExecResult<()> {
    let seconds = number_arg("wait", seconds).max(0.0);
    let duration = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);
    ctx.sleep(duration).await
}

/// Adds a copy of the executing object to the scene, flagged so its
/// start-as-clone handlers run once its behavior is installed.
pub async fn clone_self(ctx: &ExecutionContext) -> ExecResult<()> {
    let source = current(ctx).await?;
    let config = &ctx.services().config;

    let mut clone = source.clone();
    clone.id = format!("{}-{:08x}", source.id, rand::random::<u32>());
    clone.last_modified = 0;
    clone
        .metadata
        .insert(config.clone_flag_key.clone(), Json::Bool(true));
    clone
        .metadata
        .insert(config.clone_source_key.clone(), Json::String(source.id.clone()));

    debug!(object = %source.id, clone = %clone.id, "spawning clone");
    ctx.services().store.add_objects(vec![clone]).await?;
    ctx.token.check()
}

/// Removes the executing object if it is a clone, ending the script.
pub async fn delete_self(ctx: &ExecutionContext) -> ExecResult<Flow> {
    let me = current(ctx).await?;
    let source_key = &ctx.services().config.clone_source_key;
    if !me.metadata.contains_key(source_key) {
        warn!(object = %me.id, "delete this clone used on an original object");
        return Ok(Flow::Next);
    }

    ctx.services().proxy.flush().await?;
    ctx.services()
        .store
        .delete_objects(std::slice::from_ref(&me.id))
        .await?;
    Ok(Flow::Halt)
}
