use tokio::time::Instant;

use crate::{
    runtime::{error::ExecResult, interpreter::ExecutionContext, value::Value},
    scene::Vector2,
};

use super::helpers::{current, lookup, mutate_self, number_arg};

fn normalize_degrees(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

pub async fn go_to(ctx: &ExecutionContext, x: &Value, y: &Value) -> ExecResult<()> {
    let target = Vector2::new(number_arg("goTo", x), number_arg("goTo", y));
    mutate_self(ctx, move |object| object.position = target).await
}

pub async fn change_x(ctx: &ExecutionContext, dx: &Value) -> ExecResult<()> {
    let dx = number_arg("changeX", dx);
    mutate_self(ctx, move |object| object.position.x += dx).await
}

pub async fn change_y(ctx: &ExecutionContext, dy: &Value) -> ExecResult<()> {
    let dy = number_arg("changeY", dy);
    mutate_self(ctx, move |object| object.position.y += dy).await
}

pub async fn set_x(ctx: &ExecutionContext, x: &Value) -> ExecResult<()> {
    let x = number_arg("setX", x);
    mutate_self(ctx, move |object| object.position.x = x).await
}

pub async fn set_y(ctx: &ExecutionContext, y: &Value) -> ExecResult<()> {
    let y = number_arg("setY", y);
    mutate_self(ctx, move |object| object.position.y = y).await
}

pub async fn turn(ctx: &ExecutionContext, degrees: &Value, clockwise: bool) -> ExecResult<()> {
    let delta = number_arg("turn", degrees);
    let delta = if clockwise { delta } else { -delta };
    mutate_self(ctx, move |object| {
        object.rotation = normalize_degrees(object.rotation + delta)
    })
    .await
}

pub async fn point_in_direction(ctx: &ExecutionContext, direction: &Value) -> ExecResult<()> {
    let direction = normalize_degrees(number_arg("pointInDirection", direction));
    mutate_self(ctx, move |object| object.rotation = direction).await
}

/// Moves along the facing direction; rotation 0 faces up the screen.
pub async fn move_steps(ctx: &ExecutionContext, steps: &Value) -> ExecResult<()> {
    let steps = number_arg("moveSteps", steps);
    mutate_self(ctx, move |object| {
        let (sin, cos) = object.rotation.to_radians().sin_cos();
        object.position.x += steps * sin;
        object.position.y -= steps * cos;
    })
    .await
}

/// Interpolates to the target one frame at a time.
pub async fn glide(ctx: &ExecutionContext, seconds: &Value, x: &Value, y: &Value) -> ExecResult<()> {
    let seconds = number_arg("glide", seconds);
    let target = Vector2::new(number_arg("glide", x), number_arg("glide", y));
    if seconds <= 0.0 {
        return mutate_self(ctx, move |object| object.position = target).await;
    }

    let start = current(ctx).await?.position;
    let frame = ctx.services().config.frame_interval();
    let began = Instant::now();
    loop {
        ctx.sleep(frame).await?;
        let t = (began.elapsed().as_secs_f64() / seconds).min(1.0);
        let step = Vector2::new(
            start.x + (target.x - start.x) * t,
            start.y + (target.y - start.y) * t,
        );
        mutate_self(ctx, move |object| object.position = step).await?;
        if t >= 1.0 {
            return Ok(());
        }
    }
}

pub async fn go_to_object(ctx: &ExecutionContext, target: &Value) -> ExecResult<()> {
    let Some(other) = lookup(ctx, "goToObject", target).await? else {
        return Ok(());
    };
    let position = other.position;
    mutate_self(ctx, move |object| object.position = position).await
}
