// src/graph/mod.rs

//! Task graph construction.
//!
//! - [`task`] defines task specs and the status lifecycle.
//! - [`builder`] assembles specs plus dependency edges into a validated DAG.
//! - [`graph`] is the immutable result the submission engine drains.

pub mod builder;
pub mod graph;
pub mod task;

pub use builder::GraphBuilder;
pub use graph::{TaskGraph, TaskNode};
pub use task::{LocalId, RemoteId, TaskSpec, TaskStatus};
