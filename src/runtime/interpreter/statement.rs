use futures::{FutureExt, future::LocalBoxFuture};
use tracing::trace;

use crate::{
    ir::{BroadcastTarget, Effect, Stmt, StopScope},
    runtime::{
        error::ExecResult,
        primitives::{control, looks, motion, sound, tags},
        value::Value,
    },
    scene::ObjectFilter,
};

use super::{Execution, Flow};

impl Execution {
    pub(super) fn exec_block<'a>(&'a self, body: &'a [Stmt]) -> LocalBoxFuture<'a, ExecResult<Flow>> {
        async move {
            for stmt in body {
                self.ctx.token.check()?;
                if self.exec_stmt(stmt).await? == Flow::Halt {
                    return Ok(Flow::Halt);
                }
            }
            Ok(Flow::Next)
        }
        .boxed_local()
    }

    async fn exec_stmt(&self, stmt: &Stmt) -> ExecResult<Flow> {
        match stmt {
            Stmt::Effect(effect) => self.exec_effect(effect).await,
            Stmt::SetVariable { var, value } => {
                let value = self.eval(value).await?;
                self.write_variable(var, value);
                Ok(Flow::Next)
            }
            Stmt::ChangeVariable { var, by } => {
                let by = self.eval(by).await?.to_number();
                let current = self.read_variable(var).to_number();
                self.write_variable(var, Value::Number(current + by));
                Ok(Flow::Next)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition).await?.to_bool() {
                    self.exec_block(then_branch).await
                } else {
                    self.exec_block(else_branch).await
                }
            }
            Stmt::Forever { body } => loop {
                self.iteration().await?;
                if self.exec_block(body).await? == Flow::Halt {
                    return Ok(Flow::Halt);
                }
            },
            Stmt::Repeat { times, body } => {
                let times = self.eval(times).await?.to_number().round().max(0.0) as u64;
                for _ in 0..times {
                    self.iteration().await?;
                    if self.exec_block(body).await? == Flow::Halt {
                        return Ok(Flow::Halt);
                    }
                }
                Ok(Flow::Next)
            }
            Stmt::RepeatUntil { condition, body } => {
                while !self.eval(condition).await?.to_bool() {
                    self.iteration().await?;
                    if self.exec_block(body).await? == Flow::Halt {
                        return Ok(Flow::Halt);
                    }
                }
                Ok(Flow::Next)
            }
            Stmt::WaitUntil { condition } => {
                let frame = self.ctx.services().config.frame_interval();
                while !self.eval(condition).await?.to_bool() {
                    self.guard.tick()?;
                    self.ctx.sleep(frame).await?;
                }
                Ok(Flow::Next)
            }
            Stmt::Wait { seconds } => {
                let seconds = self.eval(seconds).await?;
                control::wait(&self.ctx, &seconds).await?;
                Ok(Flow::Next)
            }
            Stmt::Broadcast { message, target } => {
                let message = self.eval(message).await?.to_string();
                self.broadcast(&message, target).await?;
                Ok(Flow::Next)
            }
            Stmt::Stop(scope) => Ok(self.stop(*scope)),
        }
    }

    async fn exec_effect(&self, effect: &Effect) -> ExecResult<Flow> {
        let ctx = &self.ctx;
        match effect {
            Effect::GoTo { x, y } => {
                let (x, y) = (self.eval(x).await?, self.eval(y).await?);
                motion::go_to(ctx, &x, &y).await?;
            }
            Effect::ChangeX(dx) => motion::change_x(ctx, &self.eval(dx).await?).await?,
            Effect::ChangeY(dy) => motion::change_y(ctx, &self.eval(dy).await?).await?,
            Effect::SetX(x) => motion::set_x(ctx, &self.eval(x).await?).await?,
            Effect::SetY(y) => motion::set_y(ctx, &self.eval(y).await?).await?,
            Effect::Turn { degrees, clockwise } => {
                motion::turn(ctx, &self.eval(degrees).await?, *clockwise).await?
            }
            Effect::PointInDirection(direction) => {
                motion::point_in_direction(ctx, &self.eval(direction).await?).await?
            }
            Effect::MoveSteps(steps) => motion::move_steps(ctx, &self.eval(steps).await?).await?,
            Effect::Glide { seconds, x, y } => {
                let seconds = self.eval(seconds).await?;
                let (x, y) = (self.eval(x).await?, self.eval(y).await?);
                motion::glide(ctx, &seconds, &x, &y).await?;
            }
            Effect::GoToObject(target) => {
                motion::go_to_object(ctx, &self.eval(target).await?).await?
            }
            Effect::SetVisible(visible) => looks::set_visible(ctx, *visible).await?,
            Effect::SetSize(size) => looks::set_size(ctx, &self.eval(size).await?).await?,
            Effect::ChangeSize(by) => looks::change_size(ctx, &self.eval(by).await?).await?,
            Effect::SetText(text) => looks::set_text(ctx, &self.eval(text).await?).await?,
            Effect::SetLayer(layer) => looks::set_layer(ctx, layer).await?,
            Effect::Arrange(order) => looks::arrange(ctx, *order).await?,
            Effect::SetLocked(locked) => looks::set_locked(ctx, *locked).await?,
            Effect::PlaySound { name, wait } => {
                sound::play(ctx, &self.eval(name).await?, *wait).await?
            }
            Effect::StopSounds => sound::stop_all(ctx),
            Effect::AddTag(tag) => tags::add(ctx, &self.eval(tag).await?).await?,
            Effect::RemoveTag(tag) => tags::remove(ctx, &self.eval(tag).await?).await?,
            Effect::CloneSelf => control::clone_self(ctx).await?,
            Effect::DeleteSelf => return control::delete_self(ctx).await,
        }
        Ok(Flow::Next)
    }

    async fn broadcast(&self, message: &str, target: &BroadcastTarget) -> ExecResult<()> {
        let ctx = &self.ctx;
        let targets = match target {
            BroadcastTarget::Everyone => None,
            BroadcastTarget::OnlySelf => Some(vec![ctx.object_id.clone()]),
            BroadcastTarget::Attachments => {
                let filter = ObjectFilter::AttachedTo(ctx.object_id.clone());
                let attached = ctx.services().proxy.get_all(Some(&filter)).await?;
                ctx.token.check()?;
                Some(attached.into_iter().map(|object| object.id).collect())
            }
            BroadcastTarget::Object(expr) => Some(vec![self.eval(expr).await?.to_string()]),
        };

        let started = ctx.registry.dispatch_broadcast(message, targets.as_deref());
        trace!(object = %ctx.object_id, message, started, "broadcast sent");
        ctx.token.check()
    }

    fn stop(&self, scope: StopScope) -> Flow {
        let ctx = &self.ctx;
        match scope {
            StopScope::ThisScript => {}
            StopScope::OtherScriptsOnObject => {
                ctx.registry
                    .stop_behaviors_for_item(&ctx.object_id, Some(&ctx.hat_id));
                return Flow::Next;
            }
            StopScope::All => {
                ctx.services().host.stop_sounds();
                ctx.registry.stop_all();
            }
        }
        Flow::Halt
    }
}
