//! Naming resolver.
//!
//! Computes a collision-free display name given the set of names already
//! present in the file index. The disambiguation marker `(n)` goes
//! immediately before the last `.` of the name, or at the end if the name
//! has no extension. The counter increments on every retry and the loop is
//! bounded, so resolution always terminates.

use std::collections::HashSet;

use crate::error::{Result, SyncError};

/// Upper bound on disambiguation attempts before giving up.
const MAX_ATTEMPTS: u32 = 10_000;

/// Resolve `candidate` against `existing`, returning a name guaranteed not
/// to be in `existing`.
///
/// The candidate itself is returned unchanged when it is free; otherwise
/// `name(1).ext`, `name(2).ext`, … are tried in order.
pub fn resolve_collision(candidate: &str, existing: &HashSet<String>) -> Result<String> {
    if !existing.contains(candidate) {
        return Ok(candidate.to_string());
    }

    for counter in 1..=MAX_ATTEMPTS {
        let attempt = with_marker(candidate, counter);
        if !existing.contains(&attempt) {
            return Ok(attempt);
        }
    }

    Err(SyncError::NamingExhausted {
        candidate: candidate.to_string(),
        attempts: MAX_ATTEMPTS,
    })
}

/// Insert the `(n)` marker before the last `.`, or append it when the name
/// has no extension.
fn with_marker(name: &str, counter: u32) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}({}){}", &name[..dot], counter, &name[dot..]),
        None => format!("{}({})", name, counter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn free_candidate_is_unchanged() {
        let existing = HashSet::new();
        assert_eq!(
            resolve_collision("notes.txt", &existing).unwrap(),
            "notes.txt"
        );
    }

    #[test]
    fn first_collision_gets_marker_before_extension() {
        let existing = names(&["notes.txt"]);
        assert_eq!(
            resolve_collision("notes.txt", &existing).unwrap(),
            "notes(1).txt"
        );
    }

    #[test]
    fn counter_increments_past_taken_markers() {
        // The naive single-marker policy loops forever on exactly this
        // input; the counter must advance instead.
        let existing = names(&["notes.txt", "notes(1).txt", "notes(2).txt"]);
        assert_eq!(
            resolve_collision("notes.txt", &existing).unwrap(),
            "notes(3).txt"
        );
    }

    #[test]
    fn name_without_extension_appends_marker() {
        let existing = names(&["README"]);
        assert_eq!(resolve_collision("README", &existing).unwrap(), "README(1)");
    }

    #[test]
    fn marker_targets_last_dot_only() {
        let existing = names(&["archive.tar.gz"]);
        assert_eq!(
            resolve_collision("archive.tar.gz", &existing).unwrap(),
            "archive.tar(1).gz"
        );
    }

    #[test]
    fn never_returns_a_taken_name() {
        let mut existing = HashSet::new();
        for _ in 0..50 {
            let resolved = resolve_collision("a.txt", &existing).unwrap();
            assert!(!existing.contains(&resolved));
            existing.insert(resolved);
        }
    }
}
