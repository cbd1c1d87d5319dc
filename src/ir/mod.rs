//! Validated intermediate representation produced by the compiler and walked
//! by the interpreter. The instruction set is closed: every block type lowers
//! to one of these variants.

pub mod expr;
pub mod procedure;
pub mod stmt;
pub mod trigger;

pub use expr::{ArithOp, CompareOp, Expr, MathFn, ObjectProperty, Sensor, VarRef};
pub use procedure::{CompiledHandler, CompiledProcedure};
pub use stmt::{BroadcastTarget, Effect, Stmt, StopScope, ZOrder};
pub use trigger::{
    CollisionPhase, DICE_ROLL_SIGNAL, DOOR_SIGNAL, HandlerDescriptor, PHASE_CHANGED_SIGNAL,
    TriggerKind, ValueMatch,
};
