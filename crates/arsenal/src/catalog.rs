//! Arsenal catalog — the single whitelist authority.
//!
//! Static entries are seeded from the hand-curated template set below and
//! are immutable for the session. Dynamic entries are merged at startup
//! from the persisted store and appended on each authorized registration.
//! A dynamic name must never shadow an existing entry.

use std::collections::HashMap;

use overwatch_core::arsenal::{ArsenalEntry, DynamicTool, EntryOrigin, ParamKind, ParamSlot};
use overwatch_core::error::ArsenalError;
use overwatch_core::mission::Phase;
use overwatch_security::{CommandCheck, CommandPolicy};
use tracing::{debug, warn};

use crate::resolver::placeholders;

/// Ordered catalog with by-name lookup.
pub struct Catalog {
    entries: Vec<ArsenalEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Empty catalog. Mostly useful in tests.
    pub fn new() -> Self {
        Self { entries: Vec::new(), index: HashMap::new() }
    }

    /// Catalog seeded with the static template set.
    pub fn with_static() -> Self {
        Self::with_entries(static_entries())
    }

    /// Catalog seeded from an explicit entry set. Later duplicates of a
    /// name are dropped.
    pub fn with_entries(entries: Vec<ArsenalEntry>) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            if catalog.index.contains_key(&entry.name) {
                warn!(name = %entry.name, "Duplicate seed entry dropped");
                continue;
            }
            catalog.insert(entry);
        }
        catalog
    }

    fn insert(&mut self, entry: ArsenalEntry) {
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }

    /// Look up an entry by name.
    pub fn lookup(&self, name: &str) -> Option<&ArsenalEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// All entries, static first, dynamic in registration order.
    pub fn all(&self) -> &[ArsenalEntry] {
        &self.entries
    }

    /// Names of all entries currently in the whitelist.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Multi-line catalog summary for the prompt body.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {}", e.summary()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Merge dynamic tools loaded from the persisted store at startup.
    ///
    /// Collisions are rejected per tool and reported, not fatal — the rest
    /// of the store still loads.
    pub fn merge_dynamic(&mut self, tools: Vec<DynamicTool>) {
        for tool in tools {
            match self.register(tool, Phase::Recon) {
                Ok(name) => debug!(tool = %name, "Dynamic tool loaded from store"),
                Err(e) => warn!(error = %e, "Skipping persisted dynamic tool"),
            }
        }
    }

    /// Validate and append a dynamic tool.
    ///
    /// The raw command goes through the same safety policy as materialized
    /// commands; the name must be unique across the full catalog. On
    /// rejection the catalog is left unchanged.
    pub fn register(&mut self, tool: DynamicTool, phase: Phase) -> Result<String, ArsenalError> {
        if self.index.contains_key(&tool.name) {
            return Err(ArsenalError::NameCollision(tool.name));
        }

        if let CommandCheck::Denied { reason } = CommandPolicy::check_line(&tool.raw_command) {
            return Err(ArsenalError::UnsafeCommand { reason });
        }

        let slots = placeholders(&tool.raw_command)
            .into_iter()
            .map(|name| ParamSlot::new(name, ParamKind::Raw, 256))
            .collect();

        let name = tool.name.clone();
        self.insert(ArsenalEntry {
            name: tool.name.clone(),
            template: tool.raw_command.clone(),
            slots,
            phase,
            description: format!("Dynamic tool registered during mission {}", tool.provenance.mission_id),
            cacheable: false,
            origin: EntryOrigin::Dynamic { provenance: tool.provenance },
        });

        Ok(name)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_static()
    }
}

/// The hand-curated static template set.
fn static_entries() -> Vec<ArsenalEntry> {
    let host = |name: &str| ParamSlot::new(name, ParamKind::Host, 253);
    let url = |name: &str| ParamSlot::new(name, ParamKind::Url, 2048);

    vec![
        ArsenalEntry {
            name: "amass_passive".into(),
            template: "amass enum -passive -d {domain}".into(),
            slots: vec![host("domain")],
            phase: Phase::Recon,
            description: "Passive subdomain enumeration".into(),
            cacheable: true,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "subfinder".into(),
            template: "subfinder -d {domain} -silent".into(),
            slots: vec![host("domain")],
            phase: Phase::Recon,
            description: "Fast passive subdomain discovery".into(),
            cacheable: true,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "nmap_quick_scan".into(),
            template: "nmap -sV --top-ports 1000 -T4 --open -Pn {target}".into(),
            slots: vec![host("target")],
            phase: Phase::Recon,
            description: "Service scan of the 1000 most common ports".into(),
            cacheable: true,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "nmap_full_scan".into(),
            template: "nmap -sV -p- -T4 --open -Pn {target}".into(),
            slots: vec![host("target")],
            phase: Phase::Recon,
            description: "Full-port service scan".into(),
            cacheable: true,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "whatweb".into(),
            template: "whatweb -v --no-errors {url}".into(),
            slots: vec![url("url")],
            phase: Phase::Enumeration,
            description: "Web technology fingerprinting".into(),
            cacheable: false,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "gobuster_common".into(),
            template: "gobuster dir -u {url} -w /usr/share/seclists/Discovery/Web-Content/common.txt -t 50 -k".into(),
            slots: vec![url("url")],
            phase: Phase::Enumeration,
            description: "Common-wordlist directory brute force".into(),
            cacheable: false,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "nikto_scan".into(),
            template: "nikto -h {url} -Tuning 4,5,x".into(),
            slots: vec![url("url")],
            phase: Phase::Enumeration,
            description: "Web server vulnerability scan".into(),
            cacheable: false,
            origin: EntryOrigin::Static,
        },
        ArsenalEntry {
            name: "searchsploit".into(),
            template: "searchsploit {keyword}".into(),
            slots: vec![ParamSlot::new("keyword", ParamKind::Keyword, 128)],
            phase: Phase::Exploitation,
            description: "Exploit-DB lookup by keyword".into(),
            cacheable: true,
            origin: EntryOrigin::Static,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use overwatch_core::arsenal::Provenance;

    fn dynamic_tool(name: &str, raw: &str) -> DynamicTool {
        DynamicTool {
            name: name.into(),
            raw_command: raw.into(),
            provenance: Provenance {
                mission_id: "m-1".into(),
                target: "example.com".into(),
                iteration: 3,
                registered_at: Utc::now(),
            },
        }
    }

    #[test]
    fn static_seed_loads() {
        let catalog = Catalog::with_static();
        assert!(catalog.lookup("nmap_quick_scan").is_some());
        assert!(catalog.lookup("subfinder").is_some());
        assert!(catalog.lookup("drop_table").is_none());
        assert_eq!(catalog.all().len(), 8);
    }

    #[test]
    fn register_dynamic_tool() {
        let mut catalog = Catalog::with_static();
        catalog
            .register(dynamic_tool("httpx_probe", "httpx -u {url} -title"), Phase::Enumeration)
            .unwrap();

        let entry = catalog.lookup("httpx_probe").unwrap();
        assert!(entry.is_dynamic());
        assert!(!entry.cacheable);
        assert_eq!(entry.slots.len(), 1);
        assert_eq!(entry.slots[0].name, "url");
    }

    #[test]
    fn collision_with_static_rejected_and_catalog_unchanged() {
        let mut catalog = Catalog::with_static();
        let before = catalog.all().len();
        let err = catalog
            .register(dynamic_tool("subfinder", "subfinder -all -d {domain}"), Phase::Recon)
            .unwrap_err();
        assert_eq!(err, ArsenalError::NameCollision("subfinder".into()));
        assert_eq!(catalog.all().len(), before);
    }

    #[test]
    fn collision_with_dynamic_rejected() {
        let mut catalog = Catalog::with_static();
        catalog.register(dynamic_tool("probe", "httpx -u {url}"), Phase::Recon).unwrap();
        let err = catalog
            .register(dynamic_tool("probe", "curl {url}"), Phase::Recon)
            .unwrap_err();
        assert!(matches!(err, ArsenalError::NameCollision(_)));
    }

    #[test]
    fn unsafe_raw_command_rejected() {
        let mut catalog = Catalog::with_static();
        let err = catalog
            .register(dynamic_tool("evil", "curl {url}; rm -rf /"), Phase::Recon)
            .unwrap_err();
        assert!(matches!(err, ArsenalError::UnsafeCommand { .. }));
        assert!(catalog.lookup("evil").is_none());
    }

    #[test]
    fn merge_skips_colliding_entries() {
        let mut catalog = Catalog::with_static();
        catalog.merge_dynamic(vec![
            dynamic_tool("subfinder", "subfinder -all -d {domain}"),
            dynamic_tool("httpx_probe", "httpx -u {url}"),
        ]);
        // The shadowing entry was dropped, the fresh one merged.
        assert_eq!(catalog.all().len(), 9);
        assert!(!catalog.lookup("subfinder").unwrap().is_dynamic());
        assert!(catalog.lookup("httpx_probe").is_some());
    }

    #[test]
    fn summary_mentions_every_entry() {
        let catalog = Catalog::with_static();
        let summary = catalog.summary();
        for name in catalog.names() {
            assert!(summary.contains(name), "summary missing {name}");
        }
    }
}
