use std::rc::Rc;

use tracing::{debug, warn};

use crate::runtime::{
    error::{ExecError, ExecResult},
    interpreter::ExecutionContext,
    value::Value,
};

use super::helpers::name_arg;

/// Plays a named scene sound. With `wait` the body suspends until playback
/// ends; otherwise playback continues on its own.
pub async fn play(ctx: &ExecutionContext, name: &Value, wait: bool) -> ExecResult<()> {
    let Some(name) = name_arg("playSound", name) else {
        return Ok(());
    };
    let Some(sound) = ctx.services().resources.borrow().sound(&name).cloned() else {
        warn!(object = %ctx.object_id, sound = %name, "unknown sound");
        return Ok(());
    };

    let host = Rc::clone(&ctx.services().host);
    if !wait {
        tokio::task::spawn_local(async move {
            if let Err(err) = host.play_sound(&sound).await {
                debug!(sound = %sound.name, error = %err, "sound playback failed");
            }
        });
        return Ok(());
    }

    tokio::select! {
        result = host.play_sound(&sound) => result?,
        _ = ctx.token.cancelled() => return Err(ExecError::Cancelled),
    }
    ctx.token.check()
}

pub fn stop_all(ctx: &ExecutionContext) {
    ctx.services().host.stop_sounds();
}
