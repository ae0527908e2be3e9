//! # Overwatch Mission
//!
//! The mission control loop and its collaborators: the protocol codec
//! between mission state and planner proposals, the human authorization
//! gate, the durable mission log, and the final reporter.

pub mod gate;
pub mod log;
pub mod loop_runner;
pub mod protocol;
pub mod report;

pub use gate::{AuthorizationGate, AuthorizationRequest, ScriptedGate, TerminalGate};
pub use log::MissionLog;
pub use loop_runner::{MissionLoop, MissionOutcome, TerminationReason};
pub use protocol::{PromptContext, decode_proposal, encode_prompt};
pub use report::write_report;
