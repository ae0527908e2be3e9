//! Dummy planner — deterministic canned responses, no network.
//!
//! Used by the test suite and by offline runs (`OVERWATCH_DUMMY_PLANNER=1`).
//! With no script supplied it plays a minimal two-step mission: one quick
//! scan of the target named in the prompt, then a conclusion.

use std::sync::Mutex;

use async_trait::async_trait;
use overwatch_core::error::PlannerError;
use overwatch_core::planner::Planner;

/// Canned-response planner.
pub struct DummyPlanner {
    script: Vec<String>,
    calls: Mutex<usize>,
}

impl DummyPlanner {
    /// Replies are returned in order; once the script is exhausted every
    /// further call yields a CONCLUDE.
    pub fn scripted(script: Vec<String>) -> Self {
        Self { script, calls: Mutex::new(0) }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Pull the target out of the prompt's `Target:` line.
    fn target_from_prompt(prompt: &str) -> String {
        prompt
            .lines()
            .find_map(|line| line.strip_prefix("Target: "))
            .unwrap_or("unknown")
            .trim()
            .to_string()
    }
}

impl Default for DummyPlanner {
    fn default() -> Self {
        Self::scripted(Vec::new())
    }
}

#[async_trait]
impl Planner for DummyPlanner {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn propose(&self, prompt: &str) -> Result<String, PlannerError> {
        let mut calls = self.calls.lock().unwrap();
        let n = *calls;
        *calls += 1;

        if let Some(reply) = self.script.get(n) {
            return Ok(reply.clone());
        }

        if self.script.is_empty() && n == 0 {
            let target = Self::target_from_prompt(prompt);
            return Ok(format!(
                r#"{{"action":"EXECUTE","command":"nmap_quick_scan","args":{{"target":"{target}"}},"rationale":"Map the exposed services before anything else."}}"#
            ));
        }

        Ok(r#"{"action":"CONCLUDE","summary":"Scripted mission complete."}"#.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_script_scans_then_concludes() {
        let planner = DummyPlanner::default();
        let first = planner.propose("Target: example.com\n").await.unwrap();
        assert!(first.contains("nmap_quick_scan"));
        assert!(first.contains("example.com"));

        let second = planner.propose("Target: example.com\n").await.unwrap();
        assert!(second.contains("CONCLUDE"));
        assert_eq!(planner.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_replies_in_order_then_conclude() {
        let planner = DummyPlanner::scripted(vec!["one".into(), "two".into()]);
        assert_eq!(planner.propose("p").await.unwrap(), "one");
        assert_eq!(planner.propose("p").await.unwrap(), "two");
        assert!(planner.propose("p").await.unwrap().contains("CONCLUDE"));
    }
}
