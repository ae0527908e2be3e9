//! Command safety policy — shell-metacharacter and chained-command gate.
//!
//! Applied to every materialized command line before authorization and to
//! every raw command proposed as a dynamic tool. A command is built by
//! template substitution, never by concatenating raw model text into a
//! shell string; this policy is the backstop on top of that.

/// Result of checking a command line against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandCheck {
    /// Command passed all checks.
    Allowed,
    /// Command rejected with a reason suitable for the observation feed.
    Denied { reason: String },
}

impl CommandCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CommandCheck::Allowed)
    }
}

/// Characters that let a single command line grow into more than one
/// command or touch the filesystem/environment in ways a template never
/// intends. None of the curated templates need these.
const FORBIDDEN: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '<', '>', '\n', '\r', '"', '\'', '\\',
];

/// Unified command-line safety enforcement.
pub struct CommandPolicy;

impl CommandPolicy {
    /// Check a full command line.
    ///
    /// Rules:
    /// - Empty or whitespace-only lines are denied
    /// - Any forbidden metacharacter is denied, by name, so the rejection
    ///   fed back to the planner is actionable
    /// - Chained-command spellings (`&&`, `||`) are covered by the single
    ///   `&`/`|` rejection
    pub fn check_line(line: &str) -> CommandCheck {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return CommandCheck::Denied {
                reason: "empty command".into(),
            };
        }

        if let Some(c) = trimmed.chars().find(|c| FORBIDDEN.contains(c)) {
            return CommandCheck::Denied {
                reason: format!("forbidden shell metacharacter '{c}'"),
            };
        }

        CommandCheck::Allowed
    }

    /// Check a single substituted slot value. Same character set as the
    /// full-line check plus whitespace, since a value that sprouts extra
    /// words would alter the command's argument structure.
    pub fn check_value(value: &str) -> CommandCheck {
        if value.is_empty() {
            return CommandCheck::Denied {
                reason: "empty value".into(),
            };
        }

        if let Some(c) = value.chars().find(|c| FORBIDDEN.contains(c) || c.is_whitespace()) {
            let shown = if c.is_whitespace() { "whitespace".to_string() } else { format!("'{c}'") };
            return CommandCheck::Denied {
                reason: format!("forbidden character {shown} in value"),
            };
        }

        CommandCheck::Allowed
    }
}
