//! Execution runtime: scheduling, cancellation, batched writes and the
//! interpreter that walks compiled handler bodies.
//!
//! Everything here runs on one thread inside a `tokio::task::LocalSet`.
//! Shared state uses `Rc<RefCell<_>>`, and no borrow is held across an
//! `.await`.

pub mod cancel;
pub mod collision;
pub mod diff;
pub mod error;
pub mod interpreter;
pub mod primitives;
pub mod proxy;
pub mod registry;
pub mod services;
pub mod value;

#[cfg(test)]
mod diff_test;
#[cfg(test)]
mod registry_test;
#[cfg(test)]
mod value_test;
