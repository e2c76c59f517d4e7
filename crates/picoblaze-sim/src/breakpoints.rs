use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};

use crossbeam_utils::sync::ShardedLock;

/// Breakpoint addresses with an enabled flag each.
///
/// Clones share the same set, so the host can edit breakpoints while the
/// worker reads them once per executed step.
#[derive(Debug, Clone, Default)]
pub struct Breakpoints {
    entries: Arc<ShardedLock<BTreeMap<u16, bool>>>,
}

impl Breakpoints {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or updates the breakpoint at `address`.
    pub fn set(&self, address: u16, enabled: bool) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, enabled);
    }

    /// Removes the breakpoint at `address`, returning whether one existed.
    pub fn remove(&self, address: u16) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&address)
            .is_some()
    }

    /// Removes every breakpoint.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether an enabled breakpoint sits at `address`.
    #[must_use]
    pub fn is_enabled(&self, address: u16) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address)
            .copied()
            .unwrap_or(false)
    }

    /// Copy of the current set, ordered by address.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(u16, bool)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(&address, &enabled)| (address, enabled))
            .collect()
    }
}
