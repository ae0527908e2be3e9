//! Per-tool output filters.
//!
//! Each tool may register a specialized parser; tools without one fall
//! back to a generic truncation filter. Structured filters yield
//! `ServiceObservation`s that the loop merges into the footprint.

use std::collections::HashMap;
use std::sync::OnceLock;

use overwatch_core::mission::{Observation, ServiceObservation};
use regex::Regex;
use tracing::debug;

/// Upper bound on the text carried into the prompt by the generic filter.
pub const MAX_OUTPUT_LEN: usize = 2000;

const NO_OUTPUT_NOTICE: &str = "The tool produced no output.";

/// A specialized output parser for one tool.
pub trait OutputFilter: Send + Sync {
    fn apply(&self, raw: &str) -> Observation;
}

/// Registry of specialized filters keyed by tool name.
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn OutputFilter>>,
}

impl FilterRegistry {
    /// Empty registry — everything falls back to generic truncation.
    pub fn new() -> Self {
        Self { filters: HashMap::new() }
    }

    /// Registry with the built-in specializations.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("nmap_quick_scan", Box::new(NmapFilter));
        registry.register("nmap_full_scan", Box::new(NmapFilter));
        registry
    }

    pub fn register(&mut self, tool: impl Into<String>, filter: Box<dyn OutputFilter>) {
        self.filters.insert(tool.into(), filter);
    }

    /// Filter raw output by originating tool name.
    pub fn filter(&self, tool: &str, raw: &str) -> Observation {
        if raw.trim().is_empty() {
            return Observation::text_only(NO_OUTPUT_NOTICE);
        }

        match self.filters.get(tool) {
            Some(f) => {
                debug!(tool = %tool, "Applying specialized output filter");
                f.apply(raw)
            }
            None => Observation::text_only(truncate(raw)),
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn truncate(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() <= MAX_OUTPUT_LEN {
        return trimmed.to_string();
    }
    let mut cut = MAX_OUTPUT_LEN;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...[truncated]", &trimmed[..cut])
}

/// Structured extraction of open ports from nmap output.
struct NmapFilter;

fn nmap_port_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(\d+)/(tcp|udp)\s+open\s+(\S+)\s*(.*)$").unwrap()
    })
}

fn nmap_host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Nmap scan report for (\S+)").unwrap())
}

impl OutputFilter for NmapFilter {
    fn apply(&self, raw: &str) -> Observation {
        // Scanned host from the report line; the loop substitutes the
        // mission target when the header is missing.
        let host = nmap_host_re()
            .captures(raw)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let mut services = Vec::new();
        for caps in nmap_port_re().captures_iter(raw) {
            let Ok(port) = caps[1].parse::<u16>() else { continue };
            services.push(ServiceObservation {
                host: host.clone(),
                port,
                proto: caps[2].to_string(),
                service: caps[3].to_string(),
                detail: caps[4].trim().to_string(),
            });
        }

        if services.is_empty() {
            return Observation::text_only("Nmap found no open ports.");
        }

        let lines: Vec<String> = services
            .iter()
            .map(|s| {
                if s.detail.is_empty() {
                    format!("- {}/{} {}", s.port, s.proto, s.service)
                } else {
                    format!("- {}/{} {} {}", s.port, s.proto, s.service, s.detail)
                }
            })
            .collect();

        Observation {
            text: format!("Open ports found:\n{}", lines.join("\n")),
            services,
        }
    }
}
