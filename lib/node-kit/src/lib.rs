//! The `Node` trait, its dispatcher, and the control-loop runtime that
//! drives a node through its lifecycle on behalf of a worker (§4.5).

pub mod base;
pub mod pubsub;
pub mod runtime;

pub use runtime::{NodeRuntime, NodeRuntimeConfig};
