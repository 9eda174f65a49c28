//! Integration tests for the buffer pool.
//!
//! These tests verify cross-component behavior that unit tests don't cover:
//! eviction against real heap files, write-back, and reload in a fresh pool.

use std::sync::Arc;
use std::thread;

use heapstore::{
    BufferPool, Catalog, Config, Error, HeapFile, MemoryLog, PageId, TransactionId, TupleDesc, Type,
};
use tempfile::{tempdir, TempDir};

const PAGE_SIZE: usize = 4096;

struct TestDb {
    pool: BufferPool,
    file: Arc<HeapFile>,
    _dir: TempDir,
}

fn create_test_db(pool_pages: usize, file_pages: u32) -> TestDb {
    let dir = tempdir().unwrap();
    let desc = Arc::new(TupleDesc::new(vec![Type::Int]));
    let file = Arc::new(HeapFile::create(dir.path().join("pages.dat"), desc, PAGE_SIZE).unwrap());
    for _ in 0..file_pages {
        file.allocate_page().unwrap();
    }

    let catalog = Arc::new(Catalog::new());
    catalog.add_table(Arc::clone(&file), "pages");
    let pool = BufferPool::new(
        Config::default().with_pool_pages(pool_pages),
        catalog,
        Arc::new(MemoryLog::new()),
    )
    .unwrap();

    TestDb {
        pool,
        file,
        _dir: dir,
    }
}

/// Test data persistence across multiple eviction cycles.
#[test]
fn test_data_persistence_across_evictions() {
    let db = create_test_db(2, 5);
    let tid = TransactionId::next();

    // Write 5 pages through a 2-frame pool (forces evictions)
    for i in 0u8..5 {
        let mut guard = db.pool.get_page_write(tid, PageId::new(db.file.id(), i as u32)).unwrap();
        guard.as_mut_slice()[0] = i;
        guard.as_mut_slice()[1] = i.wrapping_mul(3);
    }

    // Read all back - verifies evicted pages were flushed
    for i in 0u8..5 {
        let guard = db.pool.get_page_read(tid, PageId::new(db.file.id(), i as u32)).unwrap();
        assert_eq!(guard.as_slice()[0], i);
        assert_eq!(guard.as_slice()[1], i.wrapping_mul(3));
    }
    assert!(db.pool.stats().snapshot().evictions >= 3);
}

/// Capacity + 1 distinct pages evicts exactly once, and a dirty victim is on
/// disk afterwards.
#[test]
fn test_one_eviction_past_capacity() {
    let db = create_test_db(3, 4);
    let tid = TransactionId::next();
    let pid = |n| PageId::new(db.file.id(), n);

    db.pool.get_page_write(tid, pid(0)).unwrap().as_mut_slice()[0] = 0x5A;
    db.pool.get_page_read(tid, pid(1)).unwrap();
    db.pool.get_page_read(tid, pid(2)).unwrap();
    assert_eq!(db.pool.stats().snapshot().evictions, 0);

    db.pool.get_page_read(tid, pid(3)).unwrap();
    assert_eq!(db.pool.stats().snapshot().evictions, 1);
    assert_eq!(db.pool.page_count(), 3);

    // CLOCK starts at frame 0, so page 0 was the victim.
    assert!(!db.pool.contains_page(pid(0)));
    assert_eq!(db.file.read_page(pid(0)).unwrap().as_slice()[0], 0x5A);
}

/// Two transactions on a two-page pool; a third page evicts one of the two.
#[test]
fn test_capacity_two_eviction() {
    let db = create_test_db(2, 3);
    let a = TransactionId::next();
    let b = TransactionId::next();
    let pid = |n| PageId::new(db.file.id(), n);

    db.pool.get_page_read(a, pid(0)).unwrap();
    db.pool.get_page_read(b, pid(1)).unwrap();
    db.pool.get_page_read(a, pid(2)).unwrap();

    let cached = db.pool.cached_pages();
    assert_eq!(cached.len(), 2);
    assert!(cached.contains(&pid(2)));
    assert!(cached.contains(&pid(0)) ^ cached.contains(&pid(1)));
    assert_eq!(db.pool.stats().snapshot().evictions, 1);
}

/// Test flush and reload across pool instances.
#[test]
fn test_flush_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reload.dat");
    let desc = Arc::new(TupleDesc::new(vec![Type::Int]));
    let data = b"persistent!";

    let pid;

    // First session: write and flush
    {
        let file = Arc::new(HeapFile::create(&path, Arc::clone(&desc), PAGE_SIZE).unwrap());
        pid = file.allocate_page().unwrap();
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file, "reload");
        let pool = BufferPool::new(Config::default(), catalog, Arc::new(MemoryLog::new())).unwrap();

        let tid = TransactionId::next();
        pool.get_page_write(tid, pid).unwrap().as_mut_slice()[..data.len()].copy_from_slice(data);
        pool.flush_all_pages().unwrap();
    }

    // Second session: verify data
    {
        let file = Arc::new(HeapFile::open(&path, desc, PAGE_SIZE).unwrap());
        assert_eq!(file.id(), pid.table_id);
        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file, "reload");
        let pool = BufferPool::new(Config::default(), catalog, Arc::new(MemoryLog::new())).unwrap();

        let guard = pool.get_page_read(TransactionId::next(), pid).unwrap();
        assert_eq!(&guard.as_slice()[..data.len()], data);
    }
}

/// Test concurrent writers to different pages.
#[test]
fn test_concurrent_writers() {
    let db = Arc::new(create_test_db(10, 5));

    let mut handles = vec![];
    for i in 0u32..5 {
        let db = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            let tid = TransactionId::next();
            let pid = PageId::new(db.file.id(), i);
            for round in 0u8..50 {
                let mut guard = db.pool.get_page_write(tid, pid).unwrap();
                guard.as_mut_slice()[0] = i as u8;
                guard.as_mut_slice()[1] = round;
            }
            db.pool.transaction_complete(tid, true).unwrap();
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0u32..5 {
        let page = db.file.read_page(PageId::new(db.file.id(), i)).unwrap();
        assert_eq!(page.as_slice()[0], i as u8);
        assert_eq!(page.as_slice()[1], 49);
    }
}

/// A writer blocks readers of the same page until it commits.
#[test]
fn test_reader_waits_for_writer() {
    let db = Arc::new(create_test_db(4, 1));
    let pid = PageId::new(db.file.id(), 0);
    let writer = TransactionId::next();

    db.pool.get_page_write(writer, pid).unwrap().as_mut_slice()[0] = 1;

    let reader = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            let tid = TransactionId::next();
            let value = db.pool.get_page_read(tid, pid).unwrap().as_slice()[0];
            db.pool.transaction_complete(tid, true).unwrap();
            value
        })
    };

    while db.pool.lock_manager().waiting_count() == 0 {
        thread::yield_now();
    }
    db.pool.get_page_write(writer, pid).unwrap().as_mut_slice()[0] = 2;
    db.pool.transaction_complete(writer, true).unwrap();

    assert_eq!(reader.join().unwrap(), 2);
}

/// Test stats accuracy.
#[test]
fn test_stats_accuracy() {
    let db = create_test_db(3, 5);
    let tid = TransactionId::next();
    let pid = |n| PageId::new(db.file.id(), n);

    for n in 0..3 {
        db.pool.get_page_read(tid, pid(n)).unwrap();
    }
    for n in 0..3 {
        db.pool.get_page_read(tid, pid(n)).unwrap();
    }
    db.pool.get_page_read(tid, pid(3)).unwrap();
    db.pool.get_page_read(tid, pid(4)).unwrap();

    let snapshot = db.pool.stats().snapshot();
    assert_eq!(snapshot.cache_misses, 5);
    assert_eq!(snapshot.cache_hits, 3);
    assert_eq!(snapshot.pages_read, 5);
    assert_eq!(snapshot.evictions, 2);
    assert_eq!(snapshot.pages_written, 0);
    assert!((snapshot.hit_rate() - 3.0 / 8.0).abs() < 1e-9);

    db.pool.stats().reset();
    assert_eq!(db.pool.stats().snapshot(), Default::default());
}

/// Every frame pinned by guards leaves nothing to evict.
#[test]
fn test_all_pinned() {
    let db = create_test_db(2, 3);
    let tid = TransactionId::next();
    let pid = |n| PageId::new(db.file.id(), n);

    let _a = db.pool.get_page_read(tid, pid(0)).unwrap();
    let _b = db.pool.get_page_read(tid, pid(1)).unwrap();

    assert!(matches!(db.pool.get_page_read(tid, pid(2)), Err(Error::NoEvictablePage)));
    // Still usable for cached pages.
    assert!(db.pool.get_page_read(tid, pid(0)).is_ok());
}
