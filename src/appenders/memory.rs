//! In-memory capturing stream

use crate::core::{LogRecord, LogStream};
use parking_lot::Mutex;
use std::sync::Arc;

/// Keeps every record it receives. Clones share the same buffer, so one
/// handle can be given to a logger while another inspects the output.
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the captured records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn last(&self) -> Option<LogRecord> {
        self.records.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Remove and return everything captured so far.
    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogStream for MemoryStream {
    fn write(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }

    fn name(&self) -> &str {
        "memory"
    }
}
