use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::{PageId, Result, TransactionId};
use crate::recovery::{LogRecord, WriteAheadLog};
use crate::storage::page::Page;

/// In-memory log. Every record is "durable" as soon as it is appended.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
    forces: AtomicU64,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record appended so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Number of times [`force`](WriteAheadLog::force) was called.
    pub fn force_count(&self) -> u64 {
        self.forces.load(Ordering::Relaxed)
    }
}

impl WriteAheadLog for MemoryLog {
    fn log_write(
        &self,
        tid: TransactionId,
        page_id: PageId,
        before: &Page,
        after: &Page,
    ) -> Result<()> {
        self.records.lock().push(LogRecord::Update {
            tid,
            page_id,
            before: before.as_slice().to_vec(),
            after: after.as_slice().to_vec(),
        });
        Ok(())
    }

    fn log_commit(&self, tid: TransactionId) -> Result<()> {
        self.records.lock().push(LogRecord::Commit(tid));
        Ok(())
    }

    fn log_abort(&self, tid: TransactionId) -> Result<()> {
        self.records.lock().push(LogRecord::Abort(tid));
        Ok(())
    }

    fn force(&self) -> Result<()> {
        self.forces.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
