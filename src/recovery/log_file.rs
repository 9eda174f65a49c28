//! File-backed write-ahead log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{Error, PageId, Result, TransactionId};
use crate::recovery::log_record::{checksum, LogRecord, FRAME_HEADER_SIZE};
use crate::recovery::WriteAheadLog;
use crate::storage::page::Page;

/// Append-only log of checksummed records.
///
/// Records are buffered in memory until [`force`](WriteAheadLog::force),
/// which flushes the buffer and syncs the file.
pub struct LogFile {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl LogFile {
    /// Open the log at `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every forced record, oldest first.
    ///
    /// A torn record at the tail (a crash mid-append) ends the log.
    ///
    /// # Errors
    /// Returns `Error::CorruptLog` with the frame's offset if a complete
    /// record fails its checksum or cannot be decoded.
    pub fn records(&self) -> Result<Vec<LogRecord>> {
        let mut bytes = Vec::new();
        File::open(&self.path)?.read_to_end(&mut bytes)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while bytes.len() - offset >= FRAME_HEADER_SIZE {
            let header = &bytes[offset..offset + FRAME_HEADER_SIZE];
            let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
            let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            let start = offset + FRAME_HEADER_SIZE;
            let Some(payload) = bytes.get(start..start + len) else {
                break;
            };

            if checksum(payload) != crc {
                return Err(Error::CorruptLog(offset as u64));
            }
            let record = LogRecord::decode(payload).ok_or(Error::CorruptLog(offset as u64))?;
            records.push(record);

            offset = start + len;
        }

        Ok(records)
    }

    fn append(&self, record: LogRecord) -> Result<()> {
        self.writer.lock().write_all(&record.encode())?;
        Ok(())
    }
}

impl WriteAheadLog for LogFile {
    fn log_write(
        &self,
        tid: TransactionId,
        page_id: PageId,
        before: &Page,
        after: &Page,
    ) -> Result<()> {
        self.append(LogRecord::Update {
            tid,
            page_id,
            before: before.as_slice().to_vec(),
            after: after.as_slice().to_vec(),
        })
    }

    fn log_commit(&self, tid: TransactionId) -> Result<()> {
        self.append(LogRecord::Commit(tid))
    }

    fn log_abort(&self, tid: TransactionId) -> Result<()> {
        self.append(LogRecord::Abort(tid))
    }

    fn force(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.flush()?;
        writer.get_ref().sync_data()?;
        debug!("forced log {}", self.path.display());
        Ok(())
    }
}
