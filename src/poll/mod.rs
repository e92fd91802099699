// src/poll/mod.rs

//! Completion polling.
//!
//! - [`filter`] builds the `find=<json>` query document.
//! - [`poller`] waits for submitted tasks to reach a terminal status.

pub mod filter;
pub mod poller;

pub use filter::PollFilter;
pub use poller::{PollOptions, Poller};
