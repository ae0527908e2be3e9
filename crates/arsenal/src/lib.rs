//! # Overwatch Arsenal
//!
//! The whitelist of command templates the system is permitted to execute,
//! the pure resolver that materializes proposals against it, and the
//! durable store for model-proposed dynamic tools.

pub mod catalog;
pub mod resolver;
pub mod store;

pub use catalog::Catalog;
pub use resolver::resolve;
pub use store::DynamicArsenalStore;
