//! Arsenal entry types — the command templates the system may execute.
//!
//! The arsenal is the single whitelist authority: a command name that is
//! not present here must never reach the executor. Static entries are
//! seeded at startup and immutable; dynamic entries are appended at
//! runtime from authorized REGISTER_TOOL proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mission::Phase;

/// Validation class for a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Hostname or domain: letters, digits, `.`, `-`, `_`.
    Host,
    /// http/https URL without whitespace or shell metacharacters.
    Url,
    /// Free keyword: printable, no shell metacharacters.
    Keyword,
    /// Anything that passes the metacharacter check.
    Raw,
}

/// One named parameter slot in a command template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSlot {
    pub name: String,
    pub kind: ParamKind,
    /// Upper bound on the substituted value length.
    pub max_len: usize,
}

impl ParamSlot {
    pub fn new(name: impl Into<String>, kind: ParamKind, max_len: usize) -> Self {
        Self { name: name.into(), kind, max_len }
    }
}

/// Where a catalog entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum EntryOrigin {
    Static,
    Dynamic { provenance: Provenance },
}

/// Which mission proposed a dynamic tool, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub mission_id: String,
    pub target: String,
    pub iteration: u32,
    pub registered_at: DateTime<Utc>,
}

/// A command template in the arsenal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArsenalEntry {
    /// Unique key across static and dynamic entries.
    pub name: String,

    /// Command line with `{slot}` placeholders.
    pub template: String,

    /// Ordered parameter slots. Dynamic tools carry the slots inferred
    /// from their raw command's placeholders.
    pub slots: Vec<ParamSlot>,

    pub phase: Phase,

    pub description: String,

    /// Heavy reconnaissance tools are memoized by the cache layer.
    #[serde(default)]
    pub cacheable: bool,

    pub origin: EntryOrigin,
}

impl ArsenalEntry {
    pub fn is_dynamic(&self) -> bool {
        matches!(self.origin, EntryOrigin::Dynamic { .. })
    }

    /// One-line summary for the catalog section of the prompt.
    pub fn summary(&self) -> String {
        let slots: Vec<&str> = self.slots.iter().map(|s| s.name.as_str()).collect();
        format!(
            "{} [{}] ({}) — {}",
            self.name,
            self.phase,
            slots.join(", "),
            self.description
        )
    }
}

/// A model-proposed tool before it becomes a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicTool {
    pub name: String,
    /// Raw command with optional `{slot}` placeholders. Must pass the same
    /// safety checks as materialized commands.
    pub raw_command: String,
    pub provenance: Provenance,
}

/// A validated, materialized command ready for authorization and execution.
///
/// Invariant: `name` is present in the catalog — the resolver is the only
/// constructor and it refuses unknown names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCommand {
    /// Catalog entry name this command was materialized from.
    pub name: String,
    /// The exact shell line that will run.
    pub line: String,
    /// Whether the originating entry is cacheable.
    pub cacheable: bool,
    /// Phase tag of the originating entry; executing it advances the
    /// mission into this phase.
    pub phase: Phase,
}
