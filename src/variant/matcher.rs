//! Class-name matching for variant predicates
//!
//! Supports exact names and glob patterns, auto-detected from the pattern
//! characters, so a shape can say "some class under this package".

use anyhow::{anyhow, Result};
use glob::Pattern;

use crate::models::HostIdentity;

/// Check if a pattern string contains glob characters
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// Match a class name against an exact name or a glob pattern
pub fn matches_class_pattern(class: &str, pattern: &str) -> bool {
    if is_glob_pattern(pattern) {
        match Pattern::new(pattern) {
            Ok(glob) => glob.matches(class),
            Err(_) => class == pattern,
        }
    } else {
        class == pattern
    }
}

/// Whether the host ships at least one class matching `pattern`
pub fn has_matching_class(identity: &HostIdentity, pattern: &str) -> bool {
    if !is_glob_pattern(pattern) {
        return identity.has_class(pattern);
    }
    identity
        .classes
        .iter()
        .any(|class| matches_class_pattern(class, pattern))
}

/// Whether every pattern finds a class on the host
pub fn has_all_classes(identity: &HostIdentity, patterns: &[&str]) -> bool {
    patterns.iter().all(|pattern| has_matching_class(identity, pattern))
}

/// Validate that all glob patterns are well formed
pub fn validate_class_patterns(patterns: &[&str]) -> Result<()> {
    for pattern in patterns {
        if is_glob_pattern(pattern) {
            Pattern::new(pattern).map_err(|e| anyhow!("Invalid class pattern '{}': {}", pattern, e))?;
        }
    }
    Ok(())
}
