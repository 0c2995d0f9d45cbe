//! Diagnostic context data model: the mutable per-scope map and its
//! immutable snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Mutable key/value diagnostic data for one logical unit of work.
///
/// Keys are unique within a context; absence of a key is distinct from
/// presence with an empty value. Iteration order is stable (sorted by key)
/// so rendered log output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticContext {
    entries: BTreeMap<String, String>,
}

impl DiagnosticContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a key.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Reads a key. Never blocks, never fails.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Removes a key; no-op if absent.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes all keys; safe to call when already empty.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns an immutable point-in-time copy, or `None` when the map is
    /// empty ("absent" snapshot).
    #[must_use]
    pub fn snapshot(&self) -> Option<ContextSnapshot> {
        if self.entries.is_empty() {
            None
        } else {
            Some(ContextSnapshot {
                entries: Arc::new(self.entries.clone()),
            })
        }
    }

    /// Replaces the entire mapping with the snapshot's contents.
    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        self.entries = (*snapshot.entries).clone();
    }
}

/// Immutable point-in-time copy of a [`DiagnosticContext`], used to carry
/// context across a scheduling boundary. Cloning is cheap (shared backing).
///
/// Non-empty by construction: an empty context snapshots to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    entries: Arc<BTreeMap<String, String>>,
}

impl ContextSnapshot {
    /// Reads a key from the snapshot.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for ContextSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.as_ref().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove_clear() {
        let mut ctx = DiagnosticContext::new();
        assert!(ctx.is_empty());

        ctx.put("requestId", "r-1");
        ctx.put("userId", "u-1");
        assert_eq!(ctx.get("requestId"), Some("r-1"));
        assert_eq!(ctx.len(), 2);

        ctx.put("requestId", "r-2");
        assert_eq!(ctx.get("requestId"), Some("r-2"));

        ctx.remove("requestId");
        assert_eq!(ctx.get("requestId"), None);
        // Removing an absent key is a no-op.
        ctx.remove("requestId");

        ctx.clear();
        assert!(ctx.is_empty());
        ctx.clear();
    }

    #[test]
    fn empty_value_is_distinct_from_absence() {
        let mut ctx = DiagnosticContext::new();
        ctx.put("key", "");
        assert_eq!(ctx.get("key"), Some(""));
        ctx.remove("key");
        assert_eq!(ctx.get("key"), None);
    }

    #[test]
    fn empty_context_snapshots_to_none() {
        let ctx = DiagnosticContext::new();
        assert!(ctx.snapshot().is_none());
    }

    #[test]
    fn snapshot_is_not_a_live_view() {
        let mut ctx = DiagnosticContext::new();
        ctx.put("requestId", "r-1");
        let snapshot = ctx.snapshot().unwrap();

        ctx.put("requestId", "r-2");
        ctx.put("extra", "x");

        assert_eq!(snapshot.get("requestId"), Some("r-1"));
        assert_eq!(snapshot.get("extra"), None);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn restore_replaces_all_entries() {
        let mut source = DiagnosticContext::new();
        source.put("requestId", "r-1");
        let snapshot = source.snapshot().unwrap();

        let mut dest = DiagnosticContext::new();
        dest.put("stale", "old");
        dest.restore(snapshot);

        assert_eq!(dest.get("requestId"), Some("r-1"));
        assert_eq!(dest.get("stale"), None);
    }

    #[test]
    fn snapshot_serializes_as_plain_map() {
        let mut ctx = DiagnosticContext::new();
        ctx.put("requestId", "r-1");
        ctx.put("userId", "u-1");
        let snapshot = ctx.snapshot().unwrap();

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "requestId": "r-1", "userId": "u-1" })
        );
    }
}
