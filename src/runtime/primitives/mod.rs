//! The behavior vocabulary: host-facing operations a handler body can call.
//!
//! Every write goes through the mutation proxy and waits for its flush,
//! which is also the body's suspension point. Bad arguments are recovered
//! locally with a warning and a neutral default.

pub mod control;
pub mod looks;
pub mod motion;
pub mod sensing;
pub mod sound;
pub mod tags;

mod helpers;
