//! The mission control loop — a state machine over proposals, human
//! decisions, and executions.
//!
//! `AWAIT_PROPOSAL → AWAIT_AUTHORIZATION → {EXECUTING | REDIRECTED |
//! TERMINATED}`. One in-flight proposal at a time; mission state is owned
//! here and mutated only at step boundaries. Resolver and registry
//! rejections never execute — they are fed back to the planner as the
//! next observation.

use std::sync::Arc;

use chrono::Utc;
use overwatch_arsenal::{Catalog, DynamicArsenalStore, resolve};
use overwatch_config::ReportFormat;
use overwatch_core::arsenal::{DynamicTool, Provenance};
use overwatch_core::error::{Error, MissionError};
use overwatch_core::mission::{MissionLogEvent, MissionState, Observation, merge_observations};
use overwatch_core::planner::Planner;
use overwatch_core::proposal::{Decision, Proposal};
use overwatch_executor::{CommandRunner, FilterRegistry, ResultCache, signature};
use tracing::{debug, info, warn};

use crate::gate::{AuthorizationGate, AuthorizationRequest};
use crate::log::MissionLog;
use crate::protocol::{PromptContext, decode_proposal, encode_prompt};
use crate::report;

/// Why the mission reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Operator chose terminate at the gate.
    OperatorTerminated,
    /// The planner sent CONCLUDE.
    ModelConcluded,
    /// Single-cycle mode completed its one iteration.
    OnceCompleted,
    /// Re-prompt retries exhausted on malformed proposals. Mission-fatal.
    RetriesExhausted,
}

/// What a finished mission leaves behind.
#[derive(Debug)]
pub struct MissionOutcome {
    pub state: MissionState,
    pub reason: TerminationReason,
    pub iterations: u32,
    /// The rendered report artifact, when writing it succeeded.
    pub report_path: Option<std::path::PathBuf>,
}

/// The orchestrator for one mission session.
pub struct MissionLoop {
    planner: Arc<dyn Planner>,
    gate: Arc<dyn AuthorizationGate>,
    catalog: Catalog,
    store: DynamicArsenalStore,
    runner: CommandRunner,
    filters: FilterRegistry,
    cache: ResultCache,
    log: MissionLog,
    max_retries: u32,
    once: bool,
    report_format: ReportFormat,
    secrets: Vec<String>,
}

impl MissionLoop {
    pub fn new(
        planner: Arc<dyn Planner>,
        gate: Arc<dyn AuthorizationGate>,
        catalog: Catalog,
        store: DynamicArsenalStore,
        log: MissionLog,
    ) -> Self {
        Self {
            planner,
            gate,
            catalog,
            store,
            runner: CommandRunner::new(900),
            filters: FilterRegistry::with_defaults(),
            cache: ResultCache::new(),
            log,
            max_retries: 3,
            once: false,
            report_format: ReportFormat::Text,
            secrets: Vec::new(),
        }
    }

    /// Force exactly one proposal/authorization cycle.
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    pub fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.runner = CommandRunner::new(secs);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    /// Operator secrets the encoder must redact from every prompt.
    pub fn with_secrets(mut self, secrets: Vec<String>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Run the mission to termination.
    pub async fn run(mut self, target: &str) -> Result<MissionOutcome, Error> {
        let mut state = MissionState::new(target);
        let mut last_observation = format!("Mission start. The target is {target}.");
        let mut iteration: u32 = 0;

        info!(target = %target, mission_id = %state.id, "Mission started");

        let reason = loop {
            iteration += 1;

            // ── AWAIT_PROPOSAL ──
            let proposal = match self.obtain_proposal(&state, &last_observation).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Terminating: no usable proposal");
                    break TerminationReason::RetriesExhausted;
                }
            };

            debug!(iteration, kind = proposal.kind(), "Proposal received");

            // ── AWAIT_AUTHORIZATION and beyond ──
            let step = match &proposal {
                Proposal::Conclude { summary } => {
                    let observation = Observation::text_only(format!("Mission concluded by planner: {summary}"));
                    self.append_event(iteration, proposal.clone(), None, None, observation, false);
                    break TerminationReason::ModelConcluded;
                }
                Proposal::Execute { command, args, rationale } => {
                    match resolve(&self.catalog, command, args) {
                        Err(e) => {
                            // Nothing resolvable to authorize: no gate,
                            // no execution, rejection becomes the feed.
                            info!(error = %e, "Proposal rejected by resolver");
                            StepResult {
                                decision: None,
                                resolved_command: None,
                                observation: Observation::text_only(format!("Proposal rejected: {e}")),
                                cache_hit: false,
                                terminal: None,
                            }
                        }
                        Ok(resolved) => {
                            let request = AuthorizationRequest {
                                kind: "EXECUTE".into(),
                                command: resolved.line.clone(),
                                rationale: rationale.clone(),
                            };
                            let decision = self.ask(&request).await?;
                            match decision {
                                Decision::Execute => {
                                    let sig = signature(command, args);
                                    let (observation, cache_hit) =
                                        self.execute(&resolved, &sig, &mut state).await;
                                    StepResult {
                                        decision: Some(Decision::Execute),
                                        resolved_command: Some(resolved.line),
                                        observation,
                                        cache_hit,
                                        terminal: None,
                                    }
                                }
                                Decision::Redirect { directive } => self.redirected(&mut state, directive),
                                Decision::Terminate => terminated(),
                            }
                        }
                    }
                }
                Proposal::RegisterTool { name, raw_command, rationale } => {
                    let request = AuthorizationRequest {
                        kind: "REGISTER_TOOL".into(),
                        command: format!("{name} :: {raw_command}"),
                        rationale: rationale.clone(),
                    };
                    let decision = self.ask(&request).await?;
                    match decision {
                        Decision::Execute => {
                            let observation =
                                self.register_tool(name, raw_command, &state, iteration);
                            StepResult {
                                decision: Some(Decision::Execute),
                                resolved_command: None,
                                observation,
                                cache_hit: false,
                                terminal: None,
                            }
                        }
                        Decision::Redirect { directive } => self.redirected(&mut state, directive),
                        Decision::Terminate => terminated(),
                    }
                }
            };

            last_observation = step.observation.text.clone();
            info!(iteration, observation = %last_observation, "Step complete");
            self.append_event(
                iteration,
                proposal,
                step.decision,
                step.resolved_command,
                step.observation,
                step.cache_hit,
            );

            if let Some(reason) = step.terminal {
                break reason;
            }

            // Single-cycle mode: one pass, whatever the decision was.
            if self.once {
                break TerminationReason::OnceCompleted;
            }
        };

        state.concluded = true;
        info!(iterations = iteration, ?reason, "Mission terminated");

        let report_path = match report::write_report(
            &state.target,
            self.log.events(),
            &self.catalog,
            self.report_format,
            self.log.path(),
        ) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Failed to write final report");
                None
            }
        };

        Ok(MissionOutcome { state, reason, iterations: iteration, report_path })
    }

    /// One bounded-retry prompt/decode exchange.
    async fn obtain_proposal(
        &self,
        state: &MissionState,
        last_observation: &str,
    ) -> Result<Proposal, Error> {
        let catalog_summary = self.catalog.summary();
        let secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
        let mut notice: Option<String> = None;

        for attempt in 1..=self.max_retries {
            let prompt = encode_prompt(&PromptContext {
                state,
                catalog_summary: &catalog_summary,
                recent_events: self.log.events(),
                last_observation,
                retry_notice: notice.as_deref(),
                secrets: &secrets,
            });

            let raw = match self.planner.propose(&prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(attempt, error = %e, "Planner request failed");
                    notice = Some(e.to_string());
                    continue;
                }
            };

            match decode_proposal(&raw) {
                Ok(proposal) => return Ok(proposal),
                Err(e) => {
                    warn!(attempt, error = %e, "Reply did not decode");
                    notice = Some(e.to_string());
                }
            }
        }

        Err(MissionError::RetriesExhausted { attempts: self.max_retries }.into())
    }

    async fn ask(&self, request: &AuthorizationRequest) -> Result<Decision, Error> {
        self.gate
            .decide(request)
            .await
            .map_err(|e| Error::Internal(format!("authorization gate failed: {e}")))
    }

    /// EXECUTING: cache consult, bounded run, filter, footprint merge.
    async fn execute(
        &mut self,
        resolved: &overwatch_core::arsenal::ResolvedCommand,
        sig: &str,
        state: &mut MissionState,
    ) -> (Observation, bool) {
        let cached = if resolved.cacheable {
            self.cache.get(sig).map(|c| c.observation.clone())
        } else {
            None
        };

        let (mut observation, cache_hit, run_succeeded) = match cached {
            Some(observation) => {
                info!(command = %resolved.name, "Cache hit, skipping execution");
                (observation, true, false)
            }
            None => {
                let (text, success) = match self.runner.run(&resolved.line).await {
                    Ok(raw) => (raw.text, raw.success),
                    Err(e) => (format!("Execution failed: {e}"), false),
                };
                (self.filters.filter(&resolved.name, &text), false, success)
            }
        };

        for service in &mut observation.services {
            if service.host.is_empty() {
                service.host = state.target.clone();
            }
        }

        // Only clean runs are worth memoizing.
        if !cache_hit && resolved.cacheable && run_succeeded {
            self.cache.put(sig.to_string(), observation.clone());
        }

        merge_observations(&mut state.footprint, &observation.services);
        state.phase = resolved.phase;
        state.steps_completed += 1;

        (observation, cache_hit)
    }

    /// REGISTER_TOOL after authorization: validate, persist, expose.
    fn register_tool(
        &mut self,
        name: &str,
        raw_command: &str,
        state: &MissionState,
        iteration: u32,
    ) -> Observation {
        let tool = DynamicTool {
            name: name.to_string(),
            raw_command: raw_command.to_string(),
            provenance: Provenance {
                mission_id: state.id.clone(),
                target: state.target.clone(),
                iteration,
                registered_at: Utc::now(),
            },
        };

        match self.catalog.register(tool.clone(), state.phase) {
            Ok(registered) => {
                let text = match self.store.append(&tool) {
                    Ok(()) => format!("Tool '{registered}' registered and persisted."),
                    Err(e) => {
                        // Usable for the session even if the write failed.
                        warn!(error = %e, "Dynamic tool not persisted");
                        format!("Tool '{registered}' registered for this session, but persisting it failed: {e}")
                    }
                };
                Observation::text_only(text)
            }
            Err(e) => Observation::text_only(format!("Tool registration rejected: {e}")),
        }
    }

    fn redirected(&self, state: &mut MissionState, directive: String) -> StepResult {
        info!(directive = %directive, "Operator redirected the mission");
        state.redirect(directive.clone());
        StepResult {
            decision: Some(Decision::Redirect { directive: directive.clone() }),
            resolved_command: None,
            observation: Observation::text_only(format!(
                "The operator redirected the mission. New directive: {directive}"
            )),
            cache_hit: false,
            terminal: None,
        }
    }

    fn append_event(
        &mut self,
        iteration: u32,
        proposal: Proposal,
        decision: Option<Decision>,
        resolved_command: Option<String>,
        observation: Observation,
        cache_hit: bool,
    ) {
        self.log.append(MissionLogEvent {
            iteration,
            proposal,
            decision,
            resolved_command,
            observation,
            cache_hit,
            timestamp: Utc::now(),
        });

        // Crash-resilience: at most the in-flight iteration is lost. A
        // failed flush is a warning; the mission continues in memory.
        if let Err(e) = self.log.flush() {
            warn!(error = %e, "Mission log flush failed, continuing in-memory");
        }
    }
}

/// Outcome of one authorization/execution branch.
struct StepResult {
    decision: Option<Decision>,
    resolved_command: Option<String>,
    observation: Observation,
    cache_hit: bool,
    terminal: Option<TerminationReason>,
}

fn terminated() -> StepResult {
    StepResult {
        decision: Some(Decision::Terminate),
        resolved_command: None,
        observation: Observation::text_only("Mission terminated by operator."),
        cache_hit: false,
        terminal: Some(TerminationReason::OperatorTerminated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ScriptedGate;
    use overwatch_providers::DummyPlanner;

    fn loop_with(
        script: Vec<String>,
        decisions: Vec<Decision>,
        dir: &std::path::Path,
    ) -> MissionLoop {
        MissionLoop::new(
            Arc::new(DummyPlanner::scripted(script)),
            Arc::new(ScriptedGate::new(decisions)),
            Catalog::with_static(),
            DynamicArsenalStore::new(dir.join("arsenal.jsonl")),
            MissionLog::new(dir.join("mission_log.json")),
        )
        .with_command_timeout_secs(10)
    }

    #[tokio::test]
    async fn unknown_command_is_rejected_without_gate() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"EXECUTE","command":"drop_table","args":{"sql":"DROP TABLE x"},"rationale":"r"}"#
                .to_string(),
            r#"{"action":"CONCLUDE","summary":"done"}"#.to_string(),
        ];
        let gate = Arc::new(ScriptedGate::new(vec![Decision::Execute]));
        let mission = MissionLoop::new(
            Arc::new(DummyPlanner::scripted(script)),
            gate.clone(),
            Catalog::with_static(),
            DynamicArsenalStore::new(dir.path().join("arsenal.jsonl")),
            MissionLog::new(dir.path().join("mission_log.json")),
        );

        let outcome = mission.run("example.com").await.unwrap();

        // The rejection never reached the gate.
        assert!(gate.requests().is_empty());
        assert_eq!(outcome.reason, TerminationReason::ModelConcluded);

        let events = MissionLog::load(&dir.path().join("mission_log.json")).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].decision.is_none());
        assert!(events[0].observation.text.contains("not in the arsenal"));
        assert!(events[0].resolved_command.is_none());
    }

    #[tokio::test]
    async fn conclude_terminates_mission() {
        let dir = tempfile::tempdir().unwrap();
        let mission = loop_with(
            vec![r#"{"action":"CONCLUDE","summary":"all quiet"}"#.to_string()],
            vec![],
            dir.path(),
        );

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::ModelConcluded);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.state.concluded);
        assert!(outcome.report_path.is_some());
    }

    #[tokio::test]
    async fn operator_terminate_ends_mission() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"EXECUTE","command":"nmap_quick_scan","args":{"target":"example.com"},"rationale":"scan"}"#
                .to_string(),
        ];
        let mission = loop_with(script, vec![Decision::Terminate], dir.path());

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::OperatorTerminated);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.state.steps_completed, 0);
    }

    #[tokio::test]
    async fn redirect_swaps_objective_without_executing() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"EXECUTE","command":"nmap_quick_scan","args":{"target":"example.com"},"rationale":"scan"}"#
                .to_string(),
            r#"{"action":"CONCLUDE","summary":"done"}"#.to_string(),
        ];
        let mission = loop_with(
            script,
            vec![Decision::Redirect { directive: "focus on the mail server".into() }],
            dir.path(),
        );

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.state.objective, "focus on the mail server");
        assert_eq!(outcome.state.steps_completed, 0);

        let events = MissionLog::load(&dir.path().join("mission_log.json")).unwrap();
        assert!(matches!(events[0].decision, Some(Decision::Redirect { .. })));
        assert!(events[0].resolved_command.is_none());
    }

    #[tokio::test]
    async fn register_tool_persists_and_extends_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"REGISTER_TOOL","name":"httpx_probe","raw_command":"httpx -u {url} -title","rationale":"probe"}"#
                .to_string(),
            r#"{"action":"CONCLUDE","summary":"done"}"#.to_string(),
        ];
        let mission = loop_with(script, vec![Decision::Execute], dir.path());

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::ModelConcluded);

        // Persisted immediately: survives independently of the session.
        let store = DynamicArsenalStore::new(dir.path().join("arsenal.jsonl"));
        let tools = store.load();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "httpx_probe");
        assert_eq!(tools[0].provenance.target, "example.com");
    }

    #[tokio::test]
    async fn registered_tool_appears_in_next_catalog_summary() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"REGISTER_TOOL","name":"subfinder_all","raw_command":"subfinder -all -d {domain}","rationale":"broader"}"#
                .to_string(),
            r#"{"action":"CONCLUDE","summary":"done"}"#.to_string(),
        ];
        let planner = Arc::new(DummyPlanner::scripted(script));
        let mission = MissionLoop::new(
            planner.clone(),
            Arc::new(ScriptedGate::new(vec![Decision::Execute])),
            Catalog::with_static(),
            DynamicArsenalStore::new(dir.path().join("arsenal.jsonl")),
            MissionLog::new(dir.path().join("mission_log.json")),
        );

        let outcome = mission.run("example.com").await.unwrap();
        // Second iteration ran, meaning the catalog summary offered the
        // new tool to the planner; report lists it as present.
        assert_eq!(outcome.iterations, 2);
        assert_eq!(planner.call_count(), 2);
    }

    #[tokio::test]
    async fn name_collision_fed_back_as_observation() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"REGISTER_TOOL","name":"subfinder","raw_command":"subfinder -all -d {domain}","rationale":"broader"}"#
                .to_string(),
            r#"{"action":"CONCLUDE","summary":"done"}"#.to_string(),
        ];
        let mission = loop_with(script, vec![Decision::Execute], dir.path());

        mission.run("example.com").await.unwrap();

        let events = MissionLog::load(&dir.path().join("mission_log.json")).unwrap();
        assert!(events[0].observation.text.contains("registration rejected"));
        assert!(events[0].observation.text.contains("already exists"));

        // Nothing persisted for the rejected tool.
        let store = DynamicArsenalStore::new(dir.path().join("arsenal.jsonl"));
        assert!(store.load().is_empty());
    }

    #[tokio::test]
    async fn once_mode_is_exactly_one_cycle() {
        let dir = tempfile::tempdir().unwrap();
        // The script could go on forever; --once must not care.
        let script = vec![
            r#"{"action":"REGISTER_TOOL","name":"probe_a","raw_command":"httpx -u {url}","rationale":"r"}"#
                .to_string(),
            r#"{"action":"REGISTER_TOOL","name":"probe_b","raw_command":"httpx -u {url}","rationale":"r"}"#
                .to_string(),
        ];
        let mission = loop_with(script, vec![Decision::Execute, Decision::Execute], dir.path())
            .with_once(true);

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::OnceCompleted);
        assert_eq!(outcome.iterations, 1);

        let events = MissionLog::load(&dir.path().join("mission_log.json")).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn once_mode_with_redirect_still_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"EXECUTE","command":"nmap_quick_scan","args":{"target":"example.com"},"rationale":"scan"}"#
                .to_string(),
        ];
        let mission = loop_with(
            script,
            vec![Decision::Redirect { directive: "elsewhere".into() }],
            dir.path(),
        )
        .with_once(true);

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::OnceCompleted);
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn malformed_replies_exhaust_retries_and_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            "not json at all".to_string(),
            "still not json".to_string(),
            "{\"action\":\"HALF\"}".to_string(),
        ];
        let planner = Arc::new(DummyPlanner::scripted(script));
        let mission = MissionLoop::new(
            planner.clone(),
            Arc::new(ScriptedGate::new(vec![])),
            Catalog::with_static(),
            DynamicArsenalStore::new(dir.path().join("arsenal.jsonl")),
            MissionLog::new(dir.path().join("mission_log.json")),
        )
        .with_max_retries(3);

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::RetriesExhausted);
        assert_eq!(planner.call_count(), 3);
        // The error report still gets generated.
        assert!(outcome.report_path.is_some());
    }

    #[tokio::test]
    async fn malformed_then_valid_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            "garbage".to_string(),
            r#"{"action":"CONCLUDE","summary":"recovered"}"#.to_string(),
        ];
        let mission = loop_with(script, vec![], dir.path());

        let outcome = mission.run("example.com").await.unwrap();
        assert_eq!(outcome.reason, TerminationReason::ModelConcluded);
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn invalid_argument_never_reaches_gate() {
        let dir = tempfile::tempdir().unwrap();
        let script = vec![
            r#"{"action":"EXECUTE","command":"nmap_quick_scan","args":{"target":"example.com; id"},"rationale":"r"}"#
                .to_string(),
            r#"{"action":"CONCLUDE","summary":"done"}"#.to_string(),
        ];
        let gate = Arc::new(ScriptedGate::new(vec![Decision::Execute]));
        let mission = MissionLoop::new(
            Arc::new(DummyPlanner::scripted(script)),
            gate.clone(),
            Catalog::with_static(),
            DynamicArsenalStore::new(dir.path().join("arsenal.jsonl")),
            MissionLog::new(dir.path().join("mission_log.json")),
        );

        mission.run("example.com").await.unwrap();
        assert!(gate.requests().is_empty());
    }
}
