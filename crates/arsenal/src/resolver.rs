//! Command resolver — validate a proposal against the catalog and
//! materialize a concrete, shell-safe command line.
//!
//! Resolution is pure and side-effect-free; it performs no I/O. Values are
//! substituted into the entry's template — never concatenated as raw model
//! text — and the finished line still has to pass the safety policy.

use std::collections::BTreeMap;

use overwatch_core::arsenal::{ParamKind, ParamSlot, ResolvedCommand};
use overwatch_core::error::ArsenalError;
use overwatch_security::{CommandCheck, CommandPolicy};

use crate::catalog::Catalog;

/// Extract `{name}` placeholders from a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start + 1..].find('}') else { break };
        let name = &rest[start + 1..start + 1 + len];
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
        rest = &rest[start + 1 + len + 1..];
    }
    out
}

/// Materialize `command` with `args` against the catalog.
pub fn resolve(
    catalog: &Catalog,
    command: &str,
    args: &BTreeMap<String, String>,
) -> Result<ResolvedCommand, ArsenalError> {
    let entry = catalog
        .lookup(command)
        .ok_or_else(|| ArsenalError::UnknownCommand(command.to_string()))?;

    // Reject argument names the template has no slot for.
    for name in args.keys() {
        if !entry.slots.iter().any(|s| &s.name == name) {
            return Err(ArsenalError::InvalidArgument {
                slot: name.clone(),
                reason: format!("no such slot on '{}'", entry.name),
            });
        }
    }

    let mut line = entry.template.clone();
    for slot in &entry.slots {
        let value = args.get(&slot.name).ok_or_else(|| ArsenalError::InvalidArgument {
            slot: slot.name.clone(),
            reason: "required slot not supplied".into(),
        })?;

        validate_value(slot, value)?;
        line = line.replace(&format!("{{{}}}", slot.name), value);
    }

    // A template placeholder with no matching slot can never be filled.
    if let Some(unfilled) = placeholders(&line).into_iter().next() {
        return Err(ArsenalError::AmbiguousTemplate { placeholder: unfilled });
    }

    if let CommandCheck::Denied { reason } = CommandPolicy::check_line(&line) {
        return Err(ArsenalError::UnsafeCommand { reason });
    }

    Ok(ResolvedCommand {
        name: entry.name.clone(),
        line,
        cacheable: entry.cacheable,
        phase: entry.phase,
    })
}

fn validate_value(slot: &ParamSlot, value: &str) -> Result<(), ArsenalError> {
    if value.is_empty() {
        return Err(ArsenalError::InvalidArgument {
            slot: slot.name.clone(),
            reason: "empty value".into(),
        });
    }

    if value.len() > slot.max_len {
        return Err(ArsenalError::InvalidArgument {
            slot: slot.name.clone(),
            reason: format!("value exceeds {} characters", slot.max_len),
        });
    }

    match slot.kind {
        ParamKind::Host => {
            if !value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')) {
                return Err(ArsenalError::InvalidArgument {
                    slot: slot.name.clone(),
                    reason: "host may only contain letters, digits, '.', '-', '_'".into(),
                });
            }
        }
        ParamKind::Url => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ArsenalError::InvalidArgument {
                    slot: slot.name.clone(),
                    reason: "url must start with http:// or https://".into(),
                });
            }
            if let CommandCheck::Denied { reason } = CommandPolicy::check_value(value) {
                return Err(ArsenalError::InvalidArgument { slot: slot.name.clone(), reason });
            }
        }
        ParamKind::Keyword => {
            if !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_' | '/'))
            {
                return Err(ArsenalError::InvalidArgument {
                    slot: slot.name.clone(),
                    reason: "keyword contains forbidden characters".into(),
                });
            }
        }
        ParamKind::Raw => {
            if let CommandCheck::Denied { reason } = CommandPolicy::check_value(value) {
                return Err(ArsenalError::InvalidArgument { slot: slot.name.clone(), reason });
            }
        }
    }

    Ok(())
}
