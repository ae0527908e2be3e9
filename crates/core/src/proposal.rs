//! Proposal and decision value objects.
//!
//! The planner's structured output for one iteration is a closed tagged
//! variant: exactly one of EXECUTE, REGISTER_TOOL, or CONCLUDE. Modeling it
//! as a serde enum removes the whole class of "proposal half-populated"
//! bugs — the protocol codec additionally holds the key set to exactly
//! the chosen variant's fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One structured suggestion from the planner for the next action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Proposal {
    /// Run a catalog command with the given argument values.
    Execute {
        command: String,
        /// Slot name → value. BTreeMap keeps the cache signature canonical.
        #[serde(default)]
        args: BTreeMap<String, String>,
        rationale: String,
    },

    /// Register a new dynamic tool for the arsenal.
    RegisterTool {
        name: String,
        raw_command: String,
        rationale: String,
    },

    /// End the mission with a summary.
    Conclude { summary: String },
}

impl Proposal {
    /// Short human-readable label for log lines and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Proposal::Execute { .. } => "EXECUTE",
            Proposal::RegisterTool { .. } => "REGISTER_TOOL",
            Proposal::Conclude { .. } => "CONCLUDE",
        }
    }

    /// The rationale the planner attached, if the variant carries one.
    pub fn rationale(&self) -> Option<&str> {
        match self {
            Proposal::Execute { rationale, .. } | Proposal::RegisterTool { rationale, .. } => {
                Some(rationale)
            }
            Proposal::Conclude { .. } => None,
        }
    }
}

/// The human operator's verdict on one proposal.
///
/// This is the only point where human judgment can veto an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Proceed with the proposed action.
    Execute,
    /// Discard the proposal; the directive replaces the next objective.
    Redirect { directive: String },
    /// End the mission immediately.
    Terminate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_round_trips() {
        let json = r#"{"action":"EXECUTE","command":"nmap_quick_scan","args":{"target":"example.com"},"rationale":"map the surface"}"#;
        let p: Proposal = serde_json::from_str(json).unwrap();
        match &p {
            Proposal::Execute { command, args, .. } => {
                assert_eq!(command, "nmap_quick_scan");
                assert_eq!(args["target"], "example.com");
            }
            _ => panic!("expected EXECUTE"),
        }
        let back = serde_json::to_string(&p).unwrap();
        let p2: Proposal = serde_json::from_str(&back).unwrap();
        assert_eq!(p, p2);
    }

    #[test]
    fn register_tool_round_trips() {
        let json = r#"{"action":"REGISTER_TOOL","name":"subfinder_all","raw_command":"subfinder -all -d {domain}","rationale":"broader sources"}"#;
        let p: Proposal = serde_json::from_str(json).unwrap();
        assert_eq!(p.kind(), "REGISTER_TOOL");
    }

    #[test]
    fn missing_fields_rejected() {
        let json = r#"{"action":"EXECUTE","command":"nmap_quick_scan"}"#;
        assert!(serde_json::from_str::<Proposal>(json).is_err());
    }

    #[test]
    fn unknown_action_rejected() {
        let json = r#"{"action":"SELF_DESTRUCT","command":"rm"}"#;
        assert!(serde_json::from_str::<Proposal>(json).is_err());
    }

    #[test]
    fn conclude_has_no_rationale() {
        let p = Proposal::Conclude { summary: "all done".into() };
        assert!(p.rationale().is_none());
    }
}
