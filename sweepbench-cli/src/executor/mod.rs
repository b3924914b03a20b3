//! Benchmark Executor
//!
//! Runs planned benchmarks and renders their results.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (from planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Run commands, classify outputs
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable or JSON output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Supervised execution and result accumulation
//! - [`formatting`] - Output formatting

mod execution;
mod formatting;

// Re-export public API
pub use execution::{ExecutionConfig, Executor};
pub use formatting::{format_human_output, format_json_output};
