//! Membership interface over reference lookup sets.

use std::collections::{HashMap, HashSet};

/// Membership test over an immutable reference code set (valid NAICS codes,
/// census GEOIDs, and the like). Implementations are read-only after load
/// and shared across concurrent validation runs.
pub trait CodeLookup: Send + Sync {
    fn contains(&self, value: &str) -> bool;
}

impl CodeLookup for HashSet<String> {
    fn contains(&self, value: &str) -> bool {
        HashSet::contains(self, value)
    }
}

impl<V: Send + Sync> CodeLookup for HashMap<String, V> {
    fn contains(&self, value: &str) -> bool {
        self.contains_key(value)
    }
}
