//! # Overwatch Executor
//!
//! Runs materialized commands with a bounded timeout, normalizes their
//! output through per-tool filters, and memoizes heavy reconnaissance
//! results by normalized signature.

pub mod cache;
pub mod filter;
pub mod runner;

pub use cache::{CachedResult, ResultCache, signature};
pub use filter::{FilterRegistry, MAX_OUTPUT_LEN};
pub use runner::{CommandRunner, RawOutput};
