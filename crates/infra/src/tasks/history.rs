//! Execution history log.

use std::collections::VecDeque;

use parking_lot::RwLock;

use autofilm_core::JobId;

use super::types::HistoryRecord;

/// Default number of records retained in memory.
pub const DEFAULT_RETENTION: usize = 1000;

/// Append-only ledger of finished executions.
///
/// Keeps at most `retention` records (oldest evicted first). Queries return
/// the most recent matching records in chronological order.
#[derive(Debug)]
pub struct HistoryLog {
    records: RwLock<VecDeque<HistoryRecord>>,
    retention: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A retention of 0 is treated as 1.
    pub fn with_retention(retention: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn append(&self, record: HistoryRecord) {
        let mut records = self.records.write();
        if records.len() == self.retention {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent `limit` records (filtered by `task_id` if given), oldest first.
    pub fn query(&self, task_id: Option<&JobId>, limit: usize) -> Vec<HistoryRecord> {
        let records = self.records.read();
        let mut matched: Vec<HistoryRecord> = records
            .iter()
            .rev()
            .filter(|r| task_id.is_none_or(|id| &r.task_id == id))
            .take(limit)
            .cloned()
            .collect();
        matched.reverse();
        matched
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
