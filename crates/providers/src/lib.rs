//! # Overwatch Providers
//!
//! `Planner` backend implementations: the Gemini HTTP backend for real
//! missions and a deterministic dummy for tests and offline runs.

pub mod dummy;
pub mod gemini;

pub use dummy::DummyPlanner;
pub use gemini::GeminiPlanner;

use std::sync::Arc;

use overwatch_config::AppConfig;
use overwatch_core::error::PlannerError;
use overwatch_core::planner::Planner;

/// Build the configured planner backend.
///
/// The dummy switch wins over everything; otherwise a missing credential is
/// a startup failure, not something discovered mid-mission.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Planner>, PlannerError> {
    if config.dummy_planner {
        return Ok(Arc::new(DummyPlanner::default()));
    }

    let api_key = config.api_key.clone().ok_or_else(|| {
        PlannerError::NotConfigured(
            "no API key found; set OVERWATCH_API_KEY or GEMINI_API_KEY, or enable the dummy planner".into(),
        )
    })?;

    Ok(Arc::new(
        GeminiPlanner::new(api_key, &config.model).with_timeout_secs(config.planner_timeout_secs),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_switch_needs_no_key() {
        let config = AppConfig { dummy_planner: true, ..Default::default() };
        let planner = build_from_config(&config).unwrap();
        assert_eq!(planner.name(), "dummy");
    }

    #[test]
    fn missing_key_is_startup_failure() {
        let config = AppConfig { api_key: None, dummy_planner: false, ..Default::default() };
        assert!(matches!(
            build_from_config(&config),
            Err(PlannerError::NotConfigured(_))
        ));
    }

    #[test]
    fn real_backend_built_with_key() {
        let config = AppConfig {
            api_key: Some("test-key".into()),
            ..Default::default()
        };
        let planner = build_from_config(&config).unwrap();
        assert_eq!(planner.name(), "gemini");
    }
}
