// src/cli.rs

//! Command-line arguments for the thin driver binary.
//!
//! The binary is deliberately small: it loads a workflow manifest, builds the
//! task graph, submits it against the control plane and prints the final
//! status map. All orchestration semantics live in the library modules.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "dagrelay", about = "Submit DAG-shaped task sets to a remote scheduler")]
pub struct CliArgs {
    /// Path to the workflow manifest (TOML).
    #[arg(default_value = "Dagrelay.toml")]
    pub manifest: String,

    /// Base URL of the control plane, e.g. "https://plane.example.com".
    #[arg(long, env = "DAGRELAY_SERVER")]
    pub server: String,

    /// Read the bearer token from this file instead of DAGRELAY_TOKEN.
    #[arg(long)]
    pub token_file: Option<String>,

    /// Log level (overrides DAGRELAY_LOG).
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Parse and validate the manifest, print the graph, submit nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Ask the control plane for the best resource per service and use it as
    /// the scheduling hint for tasks that don't pin one in the manifest.
    #[arg(long)]
    pub prefer_best: bool,

    /// Milliseconds between completion polls.
    #[arg(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Overall deadline in seconds for submission and completion waiting.
    #[arg(long, default_value_t = 600)]
    pub poll_timeout_secs: u64,

    /// HTTP request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
