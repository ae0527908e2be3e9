//! # Overwatch Core
//!
//! Domain types, traits, and error definitions for the Overwatch mission
//! controller. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem seam is defined as a trait here (the planner, the
//! authorization gate). Implementations live in their respective crates.
//! This enables:
//! - Swapping the LLM backend for a deterministic dummy in tests
//! - Driving the mission loop with a scripted gate
//! - Clean dependency graph (all crates depend inward on core)

pub mod arsenal;
pub mod error;
pub mod mission;
pub mod planner;
pub mod proposal;

// Re-export key types at crate root for ergonomics
pub use arsenal::{ArsenalEntry, DynamicTool, EntryOrigin, ParamKind, ParamSlot, Provenance, ResolvedCommand};
pub use error::{ArsenalError, Error, ExecutorError, MissionError, PlannerError, Result};
pub use mission::{Footprint, MissionLogEvent, MissionState, Observation, Phase, ServiceObservation};
pub use planner::Planner;
pub use proposal::{Decision, Proposal};
