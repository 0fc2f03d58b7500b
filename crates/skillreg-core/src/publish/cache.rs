use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Destinations already copied, shared across registrations.
///
/// Add-only; an entry is recorded only after a successful copy.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    copied: Mutex<HashSet<String>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.copied.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.set().contains(destination)
    }

    /// Record a copied destination; returns false when it was already present.
    pub fn record(&self, destination: impl Into<String>) -> bool {
        self.set().insert(destination.into())
    }

    pub fn len(&self) -> usize {
        self.set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
