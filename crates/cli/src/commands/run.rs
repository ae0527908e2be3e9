//! `overwatch` — run one supervised mission.

use std::path::PathBuf;
use std::sync::Arc;

use overwatch_arsenal::{Catalog, DynamicArsenalStore};
use overwatch_config::{AppConfig, ReportFormat};
use overwatch_executor::ResultCache;
use overwatch_mission::{MissionLog, MissionLoop, TerminalGate, TerminationReason};

/// Flag overrides carried in from the command line.
pub struct RunArgs {
    pub target: Option<String>,
    pub once: bool,
    pub report_format: Option<ReportFormat>,
    pub log_file: Option<PathBuf>,
    pub disable_cache: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Command-line flags win over file and environment.
    if let Some(format) = args.report_format {
        config.report_format = format;
    }
    if let Some(path) = args.log_file {
        config.log_file = Some(path);
    }
    if args.disable_cache {
        config.disable_cache = true;
    }

    // Check for a credential early — give a clear error
    if !config.dummy_planner && !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No planner API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OVERWATCH_API_KEY = '...'");
        eprintln!("    GEMINI_API_KEY    = '...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  For an offline dry run: OVERWATCH_DUMMY_PLANNER=1");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let target = match args.target {
        Some(t) => t,
        None => prompt_for_target()?,
    };

    let planner = overwatch_providers::build_from_config(&config)
        .map_err(|e| format!("Planner setup failed: {e}"))?;

    let store = DynamicArsenalStore::new(config.arsenal_path());
    let mut catalog = Catalog::with_static();
    catalog.merge_dynamic(store.load());

    let cache = if config.disable_cache {
        ResultCache::disabled()
    } else {
        ResultCache::new()
    };

    let secrets: Vec<String> = config.api_key.iter().cloned().collect();
    let log = MissionLog::new(config.log_path());

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Overwatch — Supervised Mission        ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Target:   {target}");
    println!("  Planner:  {}", planner.name());
    println!("  Model:    {}", config.model);
    println!("  Arsenal:  {} tools", catalog.all().len());
    println!("  Cache:    {}", if config.disable_cache { "disabled" } else { "enabled" });
    println!("  Log:      {}", config.log_path().display());
    println!();

    let mission = MissionLoop::new(planner, Arc::new(TerminalGate::new()), catalog, store, log)
        .with_once(args.once)
        .with_report_format(config.report_format)
        .with_command_timeout_secs(config.command_timeout_secs)
        .with_max_retries(config.max_proposal_retries)
        .with_cache(cache)
        .with_secrets(secrets);

    let outcome = mission.run(&target).await?;

    println!();
    println!("  Mission over after {} iteration(s).", outcome.iterations);
    println!("  Steps executed: {}", outcome.state.steps_completed);
    if let Some(path) = &outcome.report_path {
        println!("  Report: {}", path.display());
    }
    println!();

    if outcome.reason == TerminationReason::RetriesExhausted {
        return Err("mission aborted: planner retries exhausted".into());
    }

    Ok(())
}

fn prompt_for_target() -> Result<String, Box<dyn std::error::Error>> {
    use std::io::Write;
    print!("  Define the primary target of the mission: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let target = line.trim().to_string();
    if target.is_empty() {
        return Err("no target supplied".into());
    }
    Ok(target)
}
