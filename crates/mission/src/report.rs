//! Final report — derived once, at termination, by replaying the log.
//!
//! Aggregates the footprint and tool usage from the full event sequence
//! and renders to the configured output form as a uniquely named
//! artifact. Never persisted incrementally.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use overwatch_arsenal::Catalog;
use overwatch_config::ReportFormat;
use overwatch_core::error::MissionError;
use overwatch_core::mission::{Footprint, MissionLogEvent, merge_observations};
use overwatch_core::proposal::{Decision, Proposal};
use tracing::info;

/// Aggregated view computed from the full log.
struct ReportData<'a> {
    target: &'a str,
    footprint: Footprint,
    /// Tool name → (invocation count, is dynamic).
    tools_used: BTreeMap<String, (u32, bool)>,
    events: &'a [MissionLogEvent],
}

fn aggregate<'a>(target: &'a str, events: &'a [MissionLogEvent], catalog: &Catalog) -> ReportData<'a> {
    let mut footprint = Footprint::new();
    let mut tools_used: BTreeMap<String, (u32, bool)> = BTreeMap::new();

    for event in events {
        merge_observations(&mut footprint, &event.observation.services);

        if let Proposal::Execute { command, .. } = &event.proposal
            && event.decision == Some(Decision::Execute)
            && event.resolved_command.is_some()
        {
            let dynamic = catalog.lookup(command).map(|e| e.is_dynamic()).unwrap_or(false);
            let entry = tools_used.entry(command.clone()).or_insert((0, dynamic));
            entry.0 += 1;
        }
    }

    ReportData { target, footprint, tools_used, events }
}

fn render_text(data: &ReportData<'_>) -> String {
    let mut out = String::new();
    out.push_str("=== RECONNAISSANCE REPORT ===\n");
    out.push_str(&format!("Target: {}\n", data.target));
    out.push_str(&format!("Generated: {}\n\n", Utc::now().to_rfc3339()));

    out.push_str("--- Footprint ---\n");
    if data.footprint.is_empty() {
        out.push_str("No structured findings.\n");
    }
    for (host, services) in &data.footprint {
        out.push_str(&format!("{host}:\n"));
        for s in services {
            out.push_str(&format!("  {}/{} {} {}\n", s.port, s.proto, s.service, s.detail));
        }
    }

    out.push_str("\n--- Tools Used ---\n");
    for (name, (count, dynamic)) in &data.tools_used {
        let origin = if *dynamic { "dynamic" } else { "static" };
        out.push_str(&format!("{name} ({origin}): {count}\n"));
    }

    out.push_str("\n--- Action Trail ---\n");
    for event in data.events {
        out.push_str(&format!(
            "[{}] {} {}\n",
            event.iteration,
            event.proposal.kind(),
            event.resolved_command.as_deref().unwrap_or("-")
        ));
        if event.cache_hit {
            out.push_str("    (served from cache)\n");
        }
    }
    out
}

fn render_markdown(data: &ReportData<'_>) -> String {
    let mut out = String::new();
    out.push_str("# Reconnaissance Report\n\n");
    out.push_str(&format!("- **Target**: {}\n", data.target));
    out.push_str(&format!("- **Generated**: {}\n\n", Utc::now().to_rfc3339()));

    out.push_str("## Footprint\n\n");
    if data.footprint.is_empty() {
        out.push_str("No structured findings.\n");
    }
    for (host, services) in &data.footprint {
        out.push_str(&format!("### {host}\n\n"));
        for s in services {
            out.push_str(&format!("- `{}/{}` {} {}\n", s.port, s.proto, s.service, s.detail));
        }
        out.push('\n');
    }

    out.push_str("## Tools Used\n\n");
    for (name, (count, dynamic)) in &data.tools_used {
        let origin = if *dynamic { "dynamic" } else { "static" };
        out.push_str(&format!("- **{name}** ({origin}): {count}\n"));
    }

    out.push_str("\n## Actions Executed\n\n");
    for event in data.events {
        if let Some(cmd) = &event.resolved_command {
            out.push_str(&format!("```bash\n{cmd}\n```\n"));
        }
        out.push_str(&format!(
            "Iteration {} — {}{}\n\n",
            event.iteration,
            event.proposal.kind(),
            if event.cache_hit { " (cache hit)" } else { "" }
        ));
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn render_html(data: &ReportData<'_>) -> String {
    let mut out = String::new();
    out.push_str("<html>\n<head><title>Reconnaissance Report</title></head>\n<body>\n");
    out.push_str("<h1>Reconnaissance Report</h1>\n");
    out.push_str(&format!("<p>Target: {}</p>\n", escape_html(data.target)));
    out.push_str(&format!("<p>Generated: {}</p>\n", Utc::now().to_rfc3339()));

    out.push_str("<h2>Footprint</h2>\n<ul>\n");
    for (host, services) in &data.footprint {
        for s in services {
            out.push_str(&format!(
                "<li>{}: {}/{} {} {}</li>\n",
                escape_html(host),
                s.port,
                s.proto,
                escape_html(&s.service),
                escape_html(&s.detail)
            ));
        }
    }
    out.push_str("</ul>\n");

    out.push_str("<h2>Tools Used</h2>\n<ul>\n");
    for (name, (count, dynamic)) in &data.tools_used {
        let origin = if *dynamic { "dynamic" } else { "static" };
        out.push_str(&format!("<li>{} ({origin}): {count}</li>\n", escape_html(name)));
    }
    out.push_str("</ul>\n");

    out.push_str("<h2>Actions Executed</h2>\n");
    for event in data.events {
        if let Some(cmd) = &event.resolved_command {
            out.push_str(&format!("<pre><code>{}</code></pre>\n", escape_html(cmd)));
        }
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// Render the report for the given events.
pub fn render(
    target: &str,
    events: &[MissionLogEvent],
    catalog: &Catalog,
    format: ReportFormat,
) -> String {
    let data = aggregate(target, events, catalog);
    match format {
        ReportFormat::Text => render_text(&data),
        ReportFormat::Markdown => render_markdown(&data),
        ReportFormat::Html => render_html(&data),
    }
}

/// Render and write the report as a uniquely named artifact next to the
/// mission log.
pub fn write_report(
    target: &str,
    events: &[MissionLogEvent],
    catalog: &Catalog,
    format: ReportFormat,
    log_path: &Path,
) -> Result<PathBuf, MissionError> {
    let content = render(target, events, catalog, format);

    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let safe_target: String = target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("report-{safe_target}-{stamp}.{}", format.extension()));

    std::fs::write(&path, content).map_err(|e| MissionError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    info!(path = %path.display(), "Final report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use overwatch_core::mission::{Observation, ServiceObservation};

    fn events() -> Vec<MissionLogEvent> {
        vec![
            MissionLogEvent {
                iteration: 1,
                proposal: Proposal::Execute {
                    command: "nmap_quick_scan".into(),
                    args: [("target".to_string(), "example.com".to_string())].into(),
                    rationale: "map the surface".into(),
                },
                decision: Some(Decision::Execute),
                resolved_command: Some("nmap -sV --top-ports 1000 -T4 --open -Pn example.com".into()),
                observation: Observation {
                    text: "Open ports found:\n- 80/tcp http Apache httpd 2.4.41".into(),
                    services: vec![ServiceObservation {
                        host: "example.com".into(),
                        port: 80,
                        proto: "tcp".into(),
                        service: "http".into(),
                        detail: "Apache httpd 2.4.41".into(),
                    }],
                },
                cache_hit: false,
                timestamp: Utc::now(),
            },
            MissionLogEvent {
                iteration: 2,
                proposal: Proposal::Conclude { summary: "surface mapped".into() },
                decision: Some(Decision::Terminate),
                resolved_command: None,
                observation: Observation::text_only("Mission concluded"),
                cache_hit: false,
                timestamp: Utc::now(),
            },
        ]
    }

    #[test]
    fn text_report_structure() {
        let report = render("example.com", &events(), &Catalog::with_static(), ReportFormat::Text);
        assert!(report.contains("=== RECONNAISSANCE REPORT ==="));
        assert!(report.contains("Target: example.com"));
        assert!(report.contains("80/tcp http Apache httpd 2.4.41"));
        assert!(report.contains("nmap_quick_scan (static): 1"));
    }

    #[test]
    fn markdown_report_structure() {
        let report = render("example.com", &events(), &Catalog::with_static(), ReportFormat::Markdown);
        assert!(report.contains("# Reconnaissance Report"));
        assert!(report.contains("## Actions Executed"));
        assert!(report.contains("```bash"));
        assert!(report.contains("nmap -sV --top-ports 1000 -T4 --open -Pn example.com"));
    }

    #[test]
    fn html_report_structure() {
        let report = render("example.com", &events(), &Catalog::with_static(), ReportFormat::Html);
        assert!(report.contains("<html>"));
        assert!(report.contains("<h1>Reconnaissance Report</h1>"));
        assert!(report.contains("<pre><code>"));
        assert!(report.contains("example.com"));
    }

    #[test]
    fn report_artifact_is_uniquely_named() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("mission_log.json");
        let path = write_report(
            "example.com",
            &events(),
            &Catalog::with_static(),
            ReportFormat::Markdown,
            &log_path,
        )
        .unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("report-example.com-"));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn footprint_is_derived_from_log_alone() {
        let report = render("example.com", &events(), &Catalog::with_static(), ReportFormat::Text);
        // The service observation came only from the event; nothing else
        // supplied a footprint.
        assert!(report.contains("example.com:"));
    }
}
