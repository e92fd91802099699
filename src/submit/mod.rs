// src/submit/mod.rs

//! Submission of task graphs.
//!
//! - [`engine`] drains the DAG in dependency order over a transport.
//! - [`state`] owns the per-run status transitions.

pub mod engine;
mod state;

pub use engine::{SubmissionEngine, SubmissionReport, SubmitOptions};
