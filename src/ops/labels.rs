//! Display strings for ops, supplied by the UI side

use std::collections::BTreeMap;

/// Resource lookup for op labels and summaries. The engine only passes op
/// codes through; it never builds user-facing text itself.
pub trait OpLabels {
    fn label(&self, op: u32) -> Option<String>;
    fn summary(&self, op: u32) -> Option<String>;
}

/// Labels read from a string table keyed by op code
#[derive(Debug, Clone, Default)]
pub struct StringTableLabels {
    labels: BTreeMap<u32, String>,
    summaries: BTreeMap<u32, String>,
}

impl StringTableLabels {
    pub fn new(labels: BTreeMap<u32, String>, summaries: BTreeMap<u32, String>) -> Self {
        Self { labels, summaries }
    }
}

impl OpLabels for StringTableLabels {
    fn label(&self, op: u32) -> Option<String> {
        self.labels.get(&op).cloned()
    }

    fn summary(&self, op: u32) -> Option<String> {
        self.summaries.get(&op).cloned()
    }
}
