//! Write-target routing for mutations.
//!
//! A setting's name decides where its value may live. Keys matching the
//! sensitivity patterns are stored only in the secret document; callers
//! cannot force them into the general override store.

/// Name patterns that classify a setting as sensitive.
pub const SENSITIVE_MARKERS: [&str; 5] = ["key", "secret", "token", "password", "credential"];

/// Which document a mutation lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    /// `secrets.yaml`
    Sensitive,
    /// `overrides.yaml`
    General,
}

/// Classify a settings path by its trailing segment, case-insensitively.
pub fn classify(path: &str) -> WriteTarget {
    let leaf = path.rsplit('.').next().unwrap_or(path).to_ascii_lowercase();
    if SENSITIVE_MARKERS
        .iter()
        .any(|marker| leaf.contains(marker))
    {
        WriteTarget::Sensitive
    } else {
        WriteTarget::General
    }
}
