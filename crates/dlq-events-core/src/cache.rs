use std::collections::HashMap;
use std::sync::RwLock;

/// Memo of "is this queue a dead letter queue" answers.
///
/// Lives as long as the process that owns it. Entries are never evicted since
/// a single consumer only ever sees a handful of source queues. Writers for
/// the same key always compute the same answer, so last writer wins.
#[derive(Debug, Default)]
pub struct DlqStatusCache {
    entries: RwLock<HashMap<String, bool>>,
}

impl DlqStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, queue: &str) -> Option<bool> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(queue).copied()
    }

    pub fn set(&self, queue: &str, is_dlq: bool) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(queue.to_string(), is_dlq);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
