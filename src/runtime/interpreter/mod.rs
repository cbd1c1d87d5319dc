//! Async tree-walking interpreter over the compiled IR.
//!
//! One [`Execution`] runs one handler body for one object. Every suspension
//! point (flush handles, timers, host calls) is followed by a cancellation
//! checkpoint, and no `RefCell` borrow is held across an `.await`.

use std::{cell::Cell, cell::RefCell, rc::Rc, time::Duration};

use crate::{
    ir::Stmt,
    runtime::{
        cancel::CancellationToken,
        error::{ExecError, ExecResult},
        registry::TriggerRegistry,
        services::Services,
        value::Value,
    },
    scene::ObjectId,
};

mod expression;
mod statement;


/// Whether a block ran to its end or asked the script to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    Halt,
}

/// Iteration budget shared by every loop of one execution.
#[derive(Debug)]
pub struct LoopGuard {
    remaining: Cell<u64>,
}

impl LoopGuard {
    pub fn new(seed: u64) -> Self {
        Self {
            remaining: Cell::new(seed),
        }
    }

    pub fn tick(&self) -> ExecResult<()> {
        match self.remaining.get() {
            0 => Err(ExecError::LoopGuardExhausted),
            n => {
                self.remaining.set(n - 1);
                Ok(())
            }
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.get()
    }
}

/// Who is running and on whose behalf.
pub struct ExecutionContext {
    pub object_id: ObjectId,
    pub hat_id: String,
    /// Counterpart object of the triggering event, if any.
    pub other_id: Option<ObjectId>,
    pub token: CancellationToken,
    pub locals: Rc<RefCell<Vec<Value>>>,
    pub registry: TriggerRegistry,
}

impl ExecutionContext {
    pub fn services(&self) -> &Services {
        self.registry.services()
    }

    /// Timed wait that wakes early on cancellation. External state may have
    /// moved meanwhile, so the read cache is dropped afterwards.
    pub async fn sleep(&self, duration: Duration) -> ExecResult<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.token.cancelled() => return Err(ExecError::Cancelled),
        }
        self.services().proxy.invalidate();
        self.token.check()
    }
}

pub struct Execution {
    ctx: ExecutionContext,
    guard: LoopGuard,
}

impl Execution {
    pub fn new(ctx: ExecutionContext, loop_guard: u64) -> Self {
        Self {
            ctx,
            guard: LoopGuard::new(loop_guard),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub async fn run(&self, body: &[Stmt]) -> ExecResult<()> {
        self.ctx.token.check()?;
        self.exec_block(body).await.map(|_| ())
    }

    /// One loop iteration: spends guard budget and yields to other tasks.
    async fn iteration(&self) -> ExecResult<()> {
        self.guard.tick()?;
        tokio::task::yield_now().await;
        self.ctx.token.check()
    }
}
