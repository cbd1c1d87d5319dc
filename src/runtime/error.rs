use thiserror::Error;

use crate::scene::{HostError, ObjectId};

pub type ExecResult<T> = Result<T, ExecError>;

/// Why a behavior execution stopped early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    /// Not a failure: the execution was superseded or stopped.
    #[error("execution cancelled")]
    Cancelled,

    #[error("exhausted loop iterations")]
    LoopGuardExhausted,

    #[error("object `{0}` no longer exists")]
    MissingObject(ObjectId),

    #[error(transparent)]
    Host(#[from] HostError),
}

impl ExecError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}
