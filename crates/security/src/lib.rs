//! # Overwatch Security
//!
//! Safety policies shared by the command resolver and the dynamic tool
//! registry, plus prompt sanitization. The whitelist check in the resolver
//! is necessary but not sufficient — every command line that could reach a
//! shell also goes through the policy here, and every prompt that leaves
//! the process goes through the sanitizer.

pub mod policy;
pub mod sanitize;

pub use policy::{CommandCheck, CommandPolicy};
pub use sanitize::{sanitize, scan_for_leakage};
