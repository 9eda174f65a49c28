//! Slotted heap page layout.
//!
//! A heap page is a header bitmap followed by fixed-width tuple slots:
//! ```text
//! ┌──────────────────────┬─────────┬─────────┬─────┬─────────────┬─────────┐
//! │ header (⌈slots/8⌉ B) │ slot 0  │ slot 1  │ ... │ slot n-1    │ unused  │
//! └──────────────────────┴─────────┴─────────┴─────┴─────────────┴─────────┘
//! ```
//! Bit `i % 8` of header byte `i / 8` (least significant bit first) is set
//! when slot `i` holds a tuple. The slot count is the largest `n` such that
//! `n` tuples plus `n` header bits fit in the page:
//! `n = ⌊page_size × 8 / (tuple_size × 8 + 1)⌋`.
//!
//! Slot metadata only records occupancy, so a tuple keeps its slot number
//! for as long as it lives.

use std::sync::Arc;

use crate::common::{Error, PageId, Result};
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// Geometry of a heap page for a given schema and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapPageLayout {
    pub num_slots: usize,
    pub header_size: usize,
    pub tuple_size: usize,
}

impl HeapPageLayout {
    pub fn new(desc: &TupleDesc, page_size: usize) -> Self {
        let tuple_size = desc.size();
        let num_slots = (page_size * 8) / (tuple_size * 8 + 1);
        Self {
            num_slots,
            header_size: num_slots.div_ceil(8),
            tuple_size,
        }
    }

    #[inline]
    fn slot_offset(&self, slot: usize) -> usize {
        self.header_size + slot * self.tuple_size
    }
}

/// A heap-page view over a page's bytes.
///
/// Generic over the buffer so the same type serves read-only access
/// (`HeapPage<&[u8]>`) and mutation (`HeapPage<&mut [u8]>`).
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use heapstore::storage::page::HeapPage;
/// use heapstore::tuple::{Field, Tuple, TupleDesc, Type};
/// use heapstore::{PageId, TableId};
///
/// let desc = Arc::new(TupleDesc::new(vec![Type::Int]));
/// let mut bytes = vec![0u8; 4096];
/// let pid = PageId::new(TableId(1), 0);
///
/// let mut page = HeapPage::new(pid, desc.clone(), &mut bytes[..]);
/// let mut t = Tuple::new(desc, vec![Field::Int(7)]).unwrap();
/// let slot = page.insert_tuple(&mut t).unwrap();
///
/// assert_eq!(slot, 0);
/// assert_eq!(page.tuples().len(), 1);
/// ```
pub struct HeapPage<B> {
    page_id: PageId,
    desc: Arc<TupleDesc>,
    layout: HeapPageLayout,
    data: B,
}

impl<B: AsRef<[u8]>> HeapPage<B> {
    /// Interpret `data` as the heap page `page_id` of a table with `desc`.
    pub fn new(page_id: PageId, desc: Arc<TupleDesc>, data: B) -> Self {
        let layout = HeapPageLayout::new(&desc, data.as_ref().len());
        Self {
            page_id,
            desc,
            layout,
            data,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn layout(&self) -> HeapPageLayout {
        self.layout
    }

    pub fn num_slots(&self) -> usize {
        self.layout.num_slots
    }

    /// Whether slot `slot` holds a tuple. Out-of-range slots are never used.
    pub fn is_slot_used(&self, slot: usize) -> bool {
        if slot >= self.layout.num_slots {
            return false;
        }
        let byte = self.data.as_ref()[slot / 8];
        byte & (1 << (slot % 8)) != 0
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.layout.num_slots)
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        (0..self.layout.num_slots).find(|&slot| !self.is_slot_used(slot))
    }

    /// The tuple stored in `slot`, with its record id set.
    pub fn tuple(&self, slot: usize) -> Option<Tuple> {
        if !self.is_slot_used(slot) {
            return None;
        }
        let start = self.layout.slot_offset(slot);
        let bytes = &self.data.as_ref()[start..start + self.layout.tuple_size];
        let mut tuple = Tuple::deserialize(self.desc.clone(), bytes);
        tuple.set_record_id(Some(RecordId::new(self.page_id, slot)));
        Some(tuple)
    }

    /// All stored tuples in slot order.
    pub fn tuples(&self) -> Vec<Tuple> {
        (0..self.layout.num_slots)
            .filter_map(|slot| self.tuple(slot))
            .collect()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeapPage<B> {
    fn set_slot_used(&mut self, slot: usize, used: bool) {
        let byte = &mut self.data.as_mut()[slot / 8];
        if used {
            *byte |= 1 << (slot % 8);
        } else {
            *byte &= !(1 << (slot % 8));
        }
    }

    /// Store `tuple` in the first free slot and record its new location.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple's schema differs from the page's
    /// - `Error::PageFull` if no slot is free
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<usize> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(Error::SchemaMismatch);
        }
        let slot = self
            .first_free_slot()
            .ok_or(Error::PageFull(self.page_id))?;

        let start = self.layout.slot_offset(slot);
        let end = start + self.layout.tuple_size;
        tuple.serialize_into(&mut self.data.as_mut()[start..end]);
        self.set_slot_used(slot, true);
        tuple.set_record_id(Some(RecordId::new(self.page_id, slot)));
        Ok(slot)
    }

    /// Free the slot named by the tuple's record id.
    ///
    /// The slot bytes are left in place; only the header bit is cleared.
    ///
    /// # Errors
    /// - `Error::InvalidRecordId` if the tuple has no record id or it names
    ///   another page or a slot past the end
    /// - `Error::SlotEmpty` if the slot is already free
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| Error::InvalidRecordId("tuple has no record id".into()))?;
        if rid.page_id != self.page_id || rid.slot >= self.layout.num_slots {
            return Err(Error::InvalidRecordId(format!(
                "{} is not a slot of {}",
                rid, self.page_id
            )));
        }
        if !self.is_slot_used(rid.slot) {
            return Err(Error::SlotEmpty {
                page_id: self.page_id,
                slot: rid.slot,
            });
        }
        self.set_slot_used(rid.slot, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use crate::tuple::{Field, Type};

    fn int_desc() -> Arc<TupleDesc> {
        Arc::new(TupleDesc::new(vec![Type::Int, Type::Int]))
    }

    fn pid() -> PageId {
        PageId::new(TableId(9), 0)
    }

    fn row(desc: &Arc<TupleDesc>, a: i32, b: i32) -> Tuple {
        Tuple::new(desc.clone(), vec![Field::Int(a), Field::Int(b)]).unwrap()
    }

    #[test]
    fn test_layout_for_two_ints() {
        // 4096 * 8 / (8 * 8 + 1) = 504 slots, 63 header bytes
        let layout = HeapPageLayout::new(&int_desc(), 4096);
        assert_eq!(layout.num_slots, 504);
        assert_eq!(layout.header_size, 63);
        assert!(layout.header_size + layout.num_slots * layout.tuple_size <= 4096);
    }

    #[test]
    fn test_empty_page() {
        let bytes = vec![0u8; 4096];
        let page = HeapPage::new(pid(), int_desc(), &bytes[..]);
        assert_eq!(page.num_empty_slots(), 504);
        assert!(page.tuples().is_empty());
        assert_eq!(page.tuple(0), None);
    }

    #[test]
    fn test_insert_sets_bitmap_lsb_first() {
        let desc = int_desc();
        let mut bytes = vec![0u8; 4096];
        let mut page = HeapPage::new(pid(), desc.clone(), &mut bytes[..]);

        let mut t = row(&desc, 1, 2);
        assert_eq!(page.insert_tuple(&mut t).unwrap(), 0);
        let mut t = row(&desc, 3, 4);
        assert_eq!(page.insert_tuple(&mut t).unwrap(), 1);
        assert_eq!(t.record_id(), Some(RecordId::new(pid(), 1)));
        drop(page);

        assert_eq!(bytes[0], 0b0000_0011);
    }

    #[test]
    fn test_insert_then_read_back() {
        let desc = int_desc();
        let mut bytes = vec![0u8; 4096];
        let mut page = HeapPage::new(pid(), desc.clone(), &mut bytes[..]);

        for i in 0..10 {
            page.insert_tuple(&mut row(&desc, i, i * 10)).unwrap();
        }
        let tuples = page.tuples();
        assert_eq!(tuples.len(), 10);
        assert_eq!(tuples[3].field(1), Some(&Field::Int(30)));
        assert_eq!(page.num_empty_slots(), 504 - 10);
    }

    #[test]
    fn test_delete_frees_slot_for_reuse() {
        let desc = int_desc();
        let mut bytes = vec![0u8; 4096];
        let mut page = HeapPage::new(pid(), desc.clone(), &mut bytes[..]);

        let mut a = row(&desc, 1, 1);
        let mut b = row(&desc, 2, 2);
        page.insert_tuple(&mut a).unwrap();
        page.insert_tuple(&mut b).unwrap();

        page.delete_tuple(&a).unwrap();
        assert!(!page.is_slot_used(0));
        assert!(page.is_slot_used(1));

        let mut c = row(&desc, 3, 3);
        assert_eq!(page.insert_tuple(&mut c).unwrap(), 0);
    }

    #[test]
    fn test_delete_twice_is_slot_empty() {
        let desc = int_desc();
        let mut bytes = vec![0u8; 4096];
        let mut page = HeapPage::new(pid(), desc.clone(), &mut bytes[..]);

        let mut a = row(&desc, 1, 1);
        page.insert_tuple(&mut a).unwrap();
        page.delete_tuple(&a).unwrap();
        assert!(matches!(page.delete_tuple(&a), Err(Error::SlotEmpty { .. })));
    }

    #[test]
    fn test_delete_rejects_foreign_record_id() {
        let desc = int_desc();
        let mut bytes = vec![0u8; 4096];
        let mut page = HeapPage::new(pid(), desc.clone(), &mut bytes[..]);

        let unplaced = row(&desc, 1, 1);
        assert!(matches!(
            page.delete_tuple(&unplaced),
            Err(Error::InvalidRecordId(_))
        ));

        let mut foreign = row(&desc, 1, 1);
        foreign.set_record_id(Some(RecordId::new(PageId::new(TableId(9), 5), 0)));
        assert!(matches!(
            page.delete_tuple(&foreign),
            Err(Error::InvalidRecordId(_))
        ));
    }

    #[test]
    fn test_insert_into_full_page() {
        let desc = int_desc();
        let mut bytes = vec![0u8; 64];
        let mut page = HeapPage::new(pid(), desc.clone(), &mut bytes[..]);
        // 64 * 8 / 65 = 7 slots
        assert_eq!(page.num_slots(), 7);

        for i in 0..7 {
            page.insert_tuple(&mut row(&desc, i, i)).unwrap();
        }
        assert!(matches!(
            page.insert_tuple(&mut row(&desc, 8, 8)),
            Err(Error::PageFull(_))
        ));
    }

    #[test]
    fn test_insert_rejects_other_schema() {
        let mut bytes = vec![0u8; 4096];
        let mut page = HeapPage::new(pid(), int_desc(), &mut bytes[..]);

        let other = Arc::new(TupleDesc::new(vec![Type::Int]));
        let mut t = Tuple::new(other, vec![Field::Int(1)]).unwrap();
        assert!(matches!(page.insert_tuple(&mut t), Err(Error::SchemaMismatch)));
    }
}
