//! Warning side channel for faults inside the logger itself
//!
//! Serializer faults, stringify failures and missing call-site info are
//! reported here instead of being raised to the caller. Warnings carrying a
//! dedup key are emitted at most once per key for the lifetime of the
//! `Diagnostics` instance.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives each emitted warning.
pub type WarningHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Deduplicating warning channel shared by a logger and its children.
///
/// # Example
///
/// ```
/// use browser_bunyan::Diagnostics;
///
/// let diagnostics = Diagnostics::new();
/// assert!(diagnostics.warn("serializer \"req\" failed", Some("req")));
/// assert!(!diagnostics.warn("serializer \"req\" failed", Some("req")));
/// assert!(diagnostics.have_warned("req"));
/// ```
pub struct Diagnostics {
    warned: Mutex<HashSet<String>>,
    emitted: AtomicU64,
    handler: WarningHandler,
}

impl Diagnostics {
    /// Diagnostics writing to stderr
    pub fn new() -> Self {
        Self::with_handler(Arc::new(|msg: &str| eprintln!("[LOGGER WARNING] {}", msg)))
    }

    pub fn with_handler(handler: WarningHandler) -> Self {
        Self {
            warned: Mutex::new(HashSet::new()),
            emitted: AtomicU64::new(0),
            handler,
        }
    }

    /// Emit a warning. Returns `false` when the dedup key was already used.
    pub fn warn(&self, msg: &str, dedup_key: Option<&str>) -> bool {
        if let Some(key) = dedup_key {
            if !self.warned.lock().insert(key.to_string()) {
                return false;
            }
        }
        self.emitted.fetch_add(1, Ordering::Relaxed);
        (self.handler)(msg);
        true
    }

    pub fn have_warned(&self, dedup_key: &str) -> bool {
        self.warned.lock().contains(dedup_key)
    }

    /// Number of warnings actually emitted
    #[inline]
    pub fn warning_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Forget every dedup key and zero the counter.
    pub fn reset(&self) {
        self.warned.lock().clear();
        self.emitted.store(0, Ordering::Relaxed);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("warned", &self.warned.lock().len())
            .field("emitted", &self.warning_count())
            .finish()
    }
}
