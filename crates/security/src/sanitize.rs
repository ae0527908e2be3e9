//! Prompt sanitization — operator secrets never leave the process.
//!
//! The protocol encoder runs every assembled prompt through `sanitize`
//! before it is handed to a planner backend.

/// Replace every occurrence of the given secrets with a redaction marker.
pub fn sanitize(text: &str, secrets: &[&str]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        if secret.is_empty() {
            continue;
        }
        out = out.replace(secret, "[REDACTED]");
    }
    out
}

/// Check whether an output string contains any of the known secrets.
pub fn scan_for_leakage(output: &str, secrets: &[&str]) -> bool {
    secrets.iter().any(|s| !s.is_empty() && output.contains(s))
}
