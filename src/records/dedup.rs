//! Recently-seen window for inserted records.
//!
//! The feed is at-least-once: a reconnect may redeliver an insert, and a
//! message can arrive on both its conversation channel and the user-wide
//! channel. The window remembers the last N inserts so each is applied once.

use crate::types::RecordKind;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Bounded set of the most recently applied inserts.
pub struct DedupWindow {
    /// `None` when deduplication is switched off.
    seen: Option<Mutex<LruCache<(RecordKind, String), ()>>>,
}

impl DedupWindow {
    /// Create a window remembering `capacity` inserts; 0 disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Record an insert. Returns false if it was already seen.
    pub fn first_sighting(&self, kind: RecordKind, id: &str) -> bool {
        let Some(seen) = &self.seen else {
            return true;
        };

        let mut seen = seen.lock();
        let key = (kind, id.to_string());
        if seen.contains(&key) {
            seen.promote(&key);
            return false;
        }
        seen.put(key, ());
        true
    }

    /// Forget everything, e.g. when the session ends.
    pub fn clear(&self) {
        if let Some(seen) = &self.seen {
            seen.lock().clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.seen.is_some()
    }

    pub fn len(&self) -> usize {
        self.seen.as_ref().map_or(0, |seen| seen.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_insert_is_rejected() {
        let window = DedupWindow::new(8);
        assert!(window.first_sighting(RecordKind::Message, "m1"));
        assert!(!window.first_sighting(RecordKind::Message, "m1"));
        // Same id, different table.
        assert!(window.first_sighting(RecordKind::Notification, "m1"));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let window = DedupWindow::new(2);
        assert!(window.first_sighting(RecordKind::Message, "a"));
        assert!(window.first_sighting(RecordKind::Message, "b"));
        assert!(window.first_sighting(RecordKind::Message, "c"));
        assert_eq!(window.len(), 2);
        // "a" fell out of the window.
        assert!(window.first_sighting(RecordKind::Message, "a"));
    }

    #[test]
    fn test_disabled_window_accepts_everything() {
        let window = DedupWindow::new(0);
        assert!(!window.is_enabled());
        assert!(window.first_sighting(RecordKind::Message, "m1"));
        assert!(window.first_sighting(RecordKind::Message, "m1"));
        assert!(window.is_empty());
    }

    #[test]
    fn test_clear() {
        let window = DedupWindow::new(4);
        window.first_sighting(RecordKind::Message, "m1");
        window.clear();
        assert!(window.first_sighting(RecordKind::Message, "m1"));
    }
}
