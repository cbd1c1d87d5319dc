pub mod compiler;
pub mod config;
pub mod graph;
pub mod ir;
pub mod runtime;
pub mod scene;
pub mod session;
