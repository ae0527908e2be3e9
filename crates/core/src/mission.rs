//! Mission state and log domain types.
//!
//! `MissionState` is the single mutable aggregate of a session: the target,
//! the operator objective, the accumulated footprint, and the phase tag.
//! It is owned by the mission loop and mutated only at step boundaries.
//! The `MissionLogEvent` sequence is the append-only record every report
//! is derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::proposal::{Decision, Proposal};

/// Campaign phase a tool or mission step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Recon,
    Enumeration,
    Exploitation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Recon => write!(f, "recon"),
            Phase::Enumeration => write!(f, "enumeration"),
            Phase::Exploitation => write!(f, "exploitation"),
        }
    }
}

/// One observed host/port/service triple, extracted from filtered tool
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceObservation {
    /// Host the service was observed on. Filters that cannot determine the
    /// host leave this empty; the loop fills in the mission target.
    #[serde(default)]
    pub host: String,
    pub port: u16,
    pub proto: String,
    pub service: String,
    /// Version/banner detail, may be empty.
    #[serde(default)]
    pub detail: String,
}

/// Accumulated structured knowledge about the target: host → services.
///
/// BTreeMap keeps report output deterministic.
pub type Footprint = BTreeMap<String, Vec<ServiceObservation>>;

/// Merge new observations into a footprint, grouped by host and
/// deduplicated on identical port/proto/service entries.
pub fn merge_observations(footprint: &mut Footprint, observations: &[ServiceObservation]) {
    for obs in observations {
        let entry = footprint.entry(obs.host.clone()).or_default();
        if !entry.iter().any(|e| e.port == obs.port && e.proto == obs.proto && e.service == obs.service) {
            entry.push(obs.clone());
        }
    }
}

/// The filtered outcome of one executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Filtered, truncation-bounded text shown to the operator and fed into
    /// the next prompt.
    pub text: String,

    /// Structured fields extracted by a specialized filter, if any.
    /// These are merged into the footprint; unstructured text updates only
    /// the action trail.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceObservation>,
}

impl Observation {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), services: Vec::new() }
    }
}

/// The mutable state of one mission session.
///
/// Created at mission start, lives for the session, discarded at
/// termination — its trail survives in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionState {
    /// Unique id, used to stamp provenance on dynamic tools.
    pub id: String,

    /// The operator-supplied target (host, domain, or URL).
    pub target: String,

    /// Current objective. Starts as the initial recon directive and is
    /// replaced wholesale when the operator redirects.
    pub objective: String,

    /// Current campaign phase.
    pub phase: Phase,

    /// Host → observed services, accumulated from structured filter output.
    pub footprint: Footprint,

    /// Number of completed proposal/authorization cycles.
    pub steps_completed: u32,

    /// Set when the mission has reached a terminal state.
    pub concluded: bool,
}

impl MissionState {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            id: Uuid::new_v4().to_string(),
            objective: format!("Initial reconnaissance of {target}"),
            target,
            phase: Phase::Recon,
            footprint: Footprint::new(),
            steps_completed: 0,
            concluded: false,
        }
    }

    /// Replace the objective with an operator directive.
    pub fn redirect(&mut self, directive: impl Into<String>) {
        self.objective = directive.into();
    }
}

/// One append-only record per mission iteration.
///
/// Never mutated after append; the log is the sole source of truth for
/// report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionLogEvent {
    pub iteration: u32,
    pub proposal: Proposal,
    /// The operator's verdict. `None` when the proposal was rejected
    /// before the gate (nothing resolvable to authorize).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// The exact materialized command line, when one was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_command: Option<String>,
    /// Filtered output, rejection notice, or termination note.
    pub observation: Observation,
    /// True when the observation was served from the cache.
    #[serde(default)]
    pub cache_hit: bool,
    pub timestamp: DateTime<Utc>,
}
