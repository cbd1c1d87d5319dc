//! Cooperative cancellation for behavior executions.
//!
//! A controller owns the right to cancel; tokens observe it. Bodies check
//! their token after every suspension point and unwind with
//! [`ExecError::Cancelled`].

use std::{cell::Cell, rc::Rc};

use tokio::sync::Notify;

use super::error::ExecError;

#[derive(Default)]
struct CancelState {
    cancelled: Cell<bool>,
    notify: Notify,
}

#[derive(Default)]
pub struct CancellationController {
    state: Rc<CancelState>,
}

#[derive(Clone)]
pub struct CancellationToken {
    state: Rc<CancelState>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            state: Rc::clone(&self.state),
        }
    }

    /// Idempotent.
    pub fn cancel(&self) {
        if !self.state.cancelled.replace(true) {
            self.state.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Checkpoint: errors once the owning controller has cancelled.
    pub fn check(&self) -> Result<(), ExecError> {
        if self.is_cancelled() {
            Err(ExecError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when cancelled. Used to race timed waits.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}
