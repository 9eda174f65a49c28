//! Log record encoding.
//!
//! # Frame Layout
//! ```text
//! ┌────────────┬────────────┬──────────────────────────────┐
//! │ len (u32)  │ crc (u32)  │ payload (len bytes)          │
//! └────────────┴────────────┴──────────────────────────────┘
//! ```
//! `crc` is the CRC32 of the payload. All integers are little-endian.
//!
//! Payload:
//! ```text
//! kind (u8) │ tid (u64) │ [table (u32) │ page_no (u32) │ before │ after]
//! ```
//! where `before` and `after` are each a `u32` length followed by the bytes,
//! present only for updates.

use crate::common::{PageId, TableId, TransactionId};

const KIND_UPDATE: u8 = 1;
const KIND_COMMIT: u8 = 2;
const KIND_ABORT: u8 = 3;

/// Size of the `len` + `crc` prefix.
pub(crate) const FRAME_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Update {
        tid: TransactionId,
        page_id: PageId,
        before: Vec<u8>,
        after: Vec<u8>,
    },
    Commit(TransactionId),
    Abort(TransactionId),
}

impl LogRecord {
    pub fn tid(&self) -> TransactionId {
        match self {
            LogRecord::Update { tid, .. } => *tid,
            LogRecord::Commit(tid) | LogRecord::Abort(tid) => *tid,
        }
    }

    /// Encode as a complete frame, header included.
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        match self {
            LogRecord::Update {
                tid,
                page_id,
                before,
                after,
            } => {
                payload.push(KIND_UPDATE);
                payload.extend_from_slice(&tid.0.to_le_bytes());
                payload.extend_from_slice(&page_id.table_id.0.to_le_bytes());
                payload.extend_from_slice(&page_id.page_no.to_le_bytes());
                for image in [before, after] {
                    payload.extend_from_slice(&(image.len() as u32).to_le_bytes());
                    payload.extend_from_slice(image);
                }
            }
            LogRecord::Commit(tid) => {
                payload.push(KIND_COMMIT);
                payload.extend_from_slice(&tid.0.to_le_bytes());
            }
            LogRecord::Abort(tid) => {
                payload.push(KIND_ABORT);
                payload.extend_from_slice(&tid.0.to_le_bytes());
            }
        }

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&checksum(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);
        frame
    }

    /// Decode a payload whose checksum has already been verified.
    ///
    /// Returns `None` if the payload is malformed.
    pub(crate) fn decode(payload: &[u8]) -> Option<Self> {
        let mut cursor = Cursor(payload);
        let kind = cursor.u8()?;
        let tid = TransactionId::new(cursor.u64()?);

        let record = match kind {
            KIND_UPDATE => {
                let table_id = TableId(cursor.u32()?);
                let page_no = cursor.u32()?;
                let before = cursor.image()?;
                let after = cursor.image()?;
                LogRecord::Update {
                    tid,
                    page_id: PageId::new(table_id, page_no),
                    before,
                    after,
                }
            }
            KIND_COMMIT => LogRecord::Commit(tid),
            KIND_ABORT => LogRecord::Abort(tid),
            _ => return None,
        };

        cursor.0.is_empty().then_some(record)
    }
}

pub(crate) fn checksum(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    hasher.finalize()
}

struct Cursor<'a>(&'a [u8]);

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.0.len() < n {
            return None;
        }
        let (head, tail) = self.0.split_at(n);
        self.0 = tail;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4)?.try_into().ok().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.take(8)?.try_into().ok().map(u64::from_le_bytes)
    }

    fn image(&mut self) -> Option<Vec<u8>> {
        let len = self.u32()? as usize;
        self.take(len).map(<[u8]>::to_vec)
    }
}
