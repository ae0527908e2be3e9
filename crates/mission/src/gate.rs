//! Authorization gate — the human-in-the-loop decision point.
//!
//! Every resolvable proposal passes through here before anything runs,
//! dynamic tools included. The whitelist check in the resolver is
//! necessary but not sufficient; only the operator's verdict releases a
//! command for execution.

use async_trait::async_trait;
use overwatch_core::proposal::Decision;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the operator sees before deciding.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Proposal kind: EXECUTE, REGISTER_TOOL.
    pub kind: String,
    /// The exact command line (or raw tool command) under consideration.
    pub command: String,
    /// The planner's strategic rationale.
    pub rationale: String,
}

/// Blocking request/response seam for the operator's verdict.
///
/// Only one decision is ever pending at a time, so a plain synchronous
/// exchange over the terminal is all the concurrency this needs.
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn decide(&self, request: &AuthorizationRequest) -> std::io::Result<Decision>;
}

/// Terminal gate: prints the briefing, reads a one-character decision.
///
/// `e` = execute, `r` = redirect (prompts for a directive), `t` = terminate.
pub struct TerminalGate;

impl TerminalGate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthorizationGate for TerminalGate {
    async fn decide(&self, request: &AuthorizationRequest) -> std::io::Result<Decision> {
        println!();
        println!("  ========================================");
        println!("  PROPOSED ACTION: {}", request.kind);
        println!("  ========================================");
        println!("  Rationale: {}", request.rationale);
        println!("  Command:   {}", request.command);
        println!();

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            print!("  Authorize? [e]xecute / [r]edirect / [t]erminate: ");
            use std::io::Write;
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                // EOF means the operator is gone; fail safe.
                return Ok(Decision::Terminate);
            };

            match line.trim().to_ascii_lowercase().as_str() {
                "e" => return Ok(Decision::Execute),
                "t" => return Ok(Decision::Terminate),
                "r" => {
                    print!("  New directive: ");
                    std::io::stdout().flush()?;
                    let directive = lines.next_line().await?.unwrap_or_default();
                    return Ok(Decision::Redirect { directive: directive.trim().to_string() });
                }
                _ => println!("  Unrecognized input."),
            }
        }
    }
}

/// Scripted gate for tests and unattended dry runs: plays back a fixed
/// decision sequence, then terminates.
pub struct ScriptedGate {
    decisions: Mutex<Vec<Decision>>,
    seen: Mutex<Vec<AuthorizationRequest>>,
}

impl ScriptedGate {
    pub fn new(mut decisions: Vec<Decision>) -> Self {
        decisions.reverse();
        Self {
            decisions: Mutex::new(decisions),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every request that reached the gate, in order.
    pub fn requests(&self) -> Vec<AuthorizationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationGate for ScriptedGate {
    async fn decide(&self, request: &AuthorizationRequest) -> std::io::Result<Decision> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self
            .decisions
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Decision::Terminate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_gate_plays_back_in_order() {
        let gate = ScriptedGate::new(vec![
            Decision::Execute,
            Decision::Redirect { directive: "dig deeper".into() },
        ]);
        let req = AuthorizationRequest {
            kind: "EXECUTE".into(),
            command: "nmap -sV example.com".into(),
            rationale: "scan".into(),
        };

        assert_eq!(gate.decide(&req).await.unwrap(), Decision::Execute);
        assert_eq!(
            gate.decide(&req).await.unwrap(),
            Decision::Redirect { directive: "dig deeper".into() }
        );
        // Script exhausted: fail safe.
        assert_eq!(gate.decide(&req).await.unwrap(), Decision::Terminate);
        assert_eq!(gate.requests().len(), 3);
    }
}
