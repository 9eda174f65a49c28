//! Property tests over heap files driven through a small buffer pool.

use std::sync::Arc;

use heapstore::{
    BufferPool, Catalog, Config, Field, HeapFile, MemoryLog, Page, PageId, TransactionId, Tuple,
    TupleDesc, Type,
};
use proptest::prelude::*;
use tempfile::tempdir;

const PAGE_SIZE: usize = 64;

#[derive(Debug, Clone)]
enum Op {
    Insert(i32),
    /// Delete the live tuple at this index (modulo the live count).
    Delete(usize),
    Commit,
    Abort,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => any::<i32>().prop_map(Op::Insert),
        3 => any::<usize>().prop_map(Op::Delete),
        1 => Just(Op::Commit),
        1 => Just(Op::Abort),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A scan returns exactly the committed inserts minus committed deletes,
    /// whatever the pool evicted along the way.
    #[test]
    fn prop_scan_matches_committed_state(ops in prop::collection::vec(op_strategy(), 1..120)) {
        let dir = tempdir().unwrap();
        let desc = Arc::new(TupleDesc::new(vec![Type::Int]));
        let path = dir.path().join("p.dat");
        let file = Arc::new(HeapFile::create(path, Arc::clone(&desc), PAGE_SIZE).unwrap());
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::clone(&file), "p");
        let config = Config::default().with_page_size(PAGE_SIZE).with_pool_pages(3);
        let pool = BufferPool::new(config, catalog, Arc::new(MemoryLog::new())).unwrap();

        let mut committed: Vec<Tuple> = Vec::new();
        let mut live: Vec<Tuple> = Vec::new();
        let mut tid = TransactionId::next();

        for op in ops {
            match op {
                Op::Insert(v) => {
                    let mut tuple = Tuple::new(Arc::clone(&desc), vec![Field::Int(v)]).unwrap();
                    pool.insert_tuple(tid, file.id(), &mut tuple).unwrap();
                    live.push(tuple);
                }
                Op::Delete(i) if !live.is_empty() => {
                    let tuple = live.swap_remove(i % live.len());
                    pool.delete_tuple(tid, &tuple).unwrap();
                }
                Op::Delete(_) => {}
                Op::Commit => {
                    pool.transaction_complete(tid, true).unwrap();
                    committed = live.clone();
                    tid = TransactionId::next();
                }
                Op::Abort => {
                    pool.transaction_complete(tid, false).unwrap();
                    live = committed.clone();
                    tid = TransactionId::next();
                }
            }
        }
        pool.transaction_complete(tid, true).unwrap();

        let reader = TransactionId::next();
        let scanned: Vec<Tuple> =
            file.iterator(&pool, reader).collect::<heapstore::Result<_>>().unwrap();
        pool.transaction_complete(reader, true).unwrap();

        let mut expected: Vec<_> = live.iter().map(|t| t.record_id()).collect();
        let mut actual: Vec<_> = scanned.iter().map(|t| t.record_id()).collect();
        expected.sort();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }

    /// Bytes written through the pool come back unchanged after eviction.
    #[test]
    fn prop_page_round_trip(data in prop::collection::vec(any::<u8>(), PAGE_SIZE), other in 1u32..4) {
        let dir = tempdir().unwrap();
        let desc = Arc::new(TupleDesc::new(vec![Type::Int]));
        let file = Arc::new(HeapFile::create(dir.path().join("r.dat"), desc, PAGE_SIZE).unwrap());
        for _ in 0..4 {
            file.allocate_page().unwrap();
        }
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(Arc::clone(&file), "r");
        let config = Config::default().with_page_size(PAGE_SIZE).with_pool_pages(1);
        let pool = BufferPool::new(config, catalog, Arc::new(MemoryLog::new())).unwrap();

        let tid = TransactionId::next();
        let target = PageId::new(file.id(), 0);
        pool.get_page_write(tid, target).unwrap().as_mut_slice().copy_from_slice(&data);
        // Evict it.
        pool.get_page_read(tid, PageId::new(file.id(), other)).unwrap();

        prop_assert_eq!(file.read_page(target).unwrap(), Page::from_bytes(data.clone()));
        let guard = pool.get_page_read(tid, target).unwrap();
        prop_assert_eq!(guard.as_slice(), &data[..]);
    }
}
