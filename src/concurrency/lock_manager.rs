//! Lock Manager - page-granularity strict two-phase locking.
//!
//! The [`LockManager`] grants shared (`Read`) and exclusive (`Write`) locks on
//! pages to transactions. Locks are held until the transaction completes;
//! the buffer pool calls [`LockManager::release_all`] at commit or abort.
//!
//! Blocked requests wait on a condition variable. Before a request blocks,
//! the wait-for graph is rebuilt from the current lock table and checked for
//! a cycle through the requester; if one exists the request is refused with
//! [`Error::Deadlock`] instead of waiting forever.

use std::collections::{HashMap, HashSet};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::common::{Error, PageId, Result, TransactionId};
use crate::concurrency::{Permission, WaitForGraph};

/// Holders of one page's lock.
///
/// At most one of `shared` / `exclusive` is non-empty at any time.
#[derive(Debug, Default)]
struct PageLock {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLock {
    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

/// All lock state, guarded by one mutex.
#[derive(Debug, Default)]
struct LockTable {
    pages: HashMap<PageId, PageLock>,
    /// Reverse index: pages each transaction holds a lock on.
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// Outstanding request of each blocked transaction.
    waiting: HashMap<TransactionId, (PageId, Permission)>,
    graph: WaitForGraph,
}

impl LockTable {
    /// Transactions whose locks prevent granting `perm` on `page_id` to `tid`.
    fn blockers(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> HashSet<TransactionId> {
        let Some(lock) = self.pages.get(&page_id) else {
            return HashSet::new();
        };

        match (lock.exclusive, perm) {
            (Some(holder), _) if holder == tid => HashSet::new(),
            (Some(holder), _) => HashSet::from([holder]),
            (None, Permission::Read) => HashSet::new(),
            // Sole shared holder upgrades in place.
            (None, Permission::Write) => {
                lock.shared.iter().copied().filter(|&t| t != tid).collect()
            }
        }
    }

    /// Grant the lock if nothing blocks it.
    fn try_grant(
        &mut self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> Option<HashSet<TransactionId>> {
        let blockers = self.blockers(tid, page_id, perm);
        if !blockers.is_empty() {
            return Some(blockers);
        }

        let lock = self.pages.entry(page_id).or_default();
        match perm {
            Permission::Read => {
                if lock.exclusive != Some(tid) {
                    lock.shared.insert(tid);
                }
            }
            Permission::Write => {
                lock.shared.remove(&tid);
                lock.exclusive = Some(tid);
            }
        }
        debug_assert!(
            lock.exclusive.is_none() || lock.shared.is_empty(),
            "{page_id} held shared and exclusive at once"
        );

        self.held.entry(tid).or_default().insert(page_id);
        None
    }

    /// Recompute every waiter's out-edges from the current holders.
    fn rebuild_graph(&mut self) {
        self.graph.clear();
        let edges: Vec<_> = self
            .waiting
            .iter()
            .map(|(&waiter, &(page_id, perm))| (waiter, self.blockers(waiter, page_id, perm)))
            .collect();
        for (waiter, holders) in edges {
            self.graph.set_waiting(waiter, holders);
        }
    }

    fn stop_waiting(&mut self, tid: TransactionId) {
        self.waiting.remove(&tid);
        self.graph.clear_waiting(tid);
    }

    fn release(&mut self, tid: TransactionId, page_id: PageId) -> bool {
        let Some(lock) = self.pages.get_mut(&page_id) else {
            return false;
        };

        let released = if lock.exclusive == Some(tid) {
            lock.exclusive = None;
            true
        } else {
            lock.shared.remove(&tid)
        };

        if lock.is_free() {
            self.pages.remove(&page_id);
        }
        released
    }
}

/// Which transactions currently hold a page's lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockHolders {
    pub shared: Vec<TransactionId>,
    pub exclusive: Option<TransactionId>,
}

/// Grants page locks under strict two-phase locking with deadlock refusal.
///
/// # Thread Safety
/// All state lives behind a single mutex. Waiters park on a condition
/// variable that is signalled on every release and every refused request.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Acquire / release
    // ========================================================================

    /// Block until `tid` holds a lock on `page_id` that covers `perm`.
    ///
    /// Re-requesting a lock already held is a no-op. A `Write` request from
    /// the only shared holder upgrades the lock in place.
    ///
    /// # Errors
    /// Returns `Error::Deadlock` if waiting would close a cycle in the
    /// wait-for graph. No lock is granted in that case; locks already held
    /// by `tid` are untouched.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, perm: Permission) -> Result<()> {
        let mut table = self.table.lock();

        loop {
            let Some(blockers) = table.try_grant(tid, page_id, perm) else {
                table.stop_waiting(tid);
                trace!("{tid} granted {perm} on {page_id}");
                return Ok(());
            };

            table.waiting.insert(tid, (page_id, perm));
            table.rebuild_graph();

            if table.graph.is_deadlocked(tid) {
                table.stop_waiting(tid);
                self.released.notify_all();
                warn!("{tid} refused {perm} on {page_id}: deadlock with {blockers:?}");
                return Err(Error::Deadlock(tid));
            }

            trace!("{tid} waiting for {perm} on {page_id} behind {blockers:?}");
            self.released.wait(&mut table);
        }
    }

    /// Release one lock early.
    ///
    /// Returns `false` if `tid` did not hold a lock on `page_id`.
    pub fn release(&self, tid: TransactionId, page_id: PageId) -> bool {
        let mut table = self.table.lock();

        let released = table.release(tid, page_id);
        if released {
            if let Some(pages) = table.held.get_mut(&tid) {
                pages.remove(&page_id);
                if pages.is_empty() {
                    table.held.remove(&tid);
                }
            }
            self.released.notify_all();
        }
        released
    }

    /// Release every lock `tid` holds and forget it entirely.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();

        let pages = table.held.remove(&tid).unwrap_or_default();
        for &page_id in &pages {
            table.release(tid, page_id);
        }
        table.waiting.remove(&tid);
        table.graph.remove_transaction(tid);

        trace!("{tid} released {} locks", pages.len());
        self.released.notify_all();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether `tid` holds any lock on `page_id`.
    pub fn holds(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tid, page_id).is_some()
    }

    /// The strongest lock `tid` holds on `page_id`.
    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<Permission> {
        let table = self.table.lock();
        let lock = table.pages.get(&page_id)?;

        if lock.exclusive == Some(tid) {
            Some(Permission::Write)
        } else if lock.shared.contains(&tid) {
            Some(Permission::Read)
        } else {
            None
        }
    }

    /// Every page `tid` holds a lock on, in no particular order.
    pub fn pages_locked_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn holders(&self, page_id: PageId) -> LockHolders {
        let table = self.table.lock();
        match table.pages.get(&page_id) {
            Some(lock) => LockHolders {
                shared: lock.shared.iter().copied().collect(),
                exclusive: lock.exclusive,
            },
            None => LockHolders::default(),
        }
    }

    /// Number of transactions currently blocked in [`acquire`](Self::acquire).
    pub fn waiting_count(&self) -> usize {
        self.table.lock().waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn pid(n: u32) -> PageId {
        PageId::new(TableId(1), n)
    }

    fn tid(n: u64) -> TransactionId {
        TransactionId::new(n)
    }

    fn wait_until_blocked(lm: &LockManager, n: usize) {
        while lm.waiting_count() < n {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_shared_locks_coexist() {
        let lm = LockManager::new();
        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();
        lm.acquire(tid(2), pid(0), Permission::Read).unwrap();

        assert_eq!(lm.lock_mode(tid(1), pid(0)), Some(Permission::Read));
        assert_eq!(lm.lock_mode(tid(2), pid(0)), Some(Permission::Read));
        assert_eq!(lm.holders(pid(0)).shared.len(), 2);
    }

    #[test]
    fn test_reacquire_is_noop() {
        let lm = LockManager::new();
        lm.acquire(tid(1), pid(0), Permission::Write).unwrap();
        lm.acquire(tid(1), pid(0), Permission::Write).unwrap();
        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();

        let holders = lm.holders(pid(0));
        assert_eq!(holders.exclusive, Some(tid(1)));
        assert!(holders.shared.is_empty());
    }

    #[test]
    fn test_sole_reader_upgrades() {
        let lm = LockManager::new();
        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();
        lm.acquire(tid(1), pid(0), Permission::Write).unwrap();

        assert_eq!(lm.lock_mode(tid(1), pid(0)), Some(Permission::Write));
        assert!(lm.holders(pid(0)).shared.is_empty());
    }

    #[test]
    fn test_release_reports_whether_held() {
        let lm = LockManager::new();
        assert!(!lm.release(tid(1), pid(0)));

        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();
        assert!(lm.release(tid(1), pid(0)));
        assert!(!lm.holds(tid(1), pid(0)));
        assert!(lm.pages_locked_by(tid(1)).is_empty());
    }

    #[test]
    fn test_release_all() {
        let lm = LockManager::new();
        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();
        lm.acquire(tid(1), pid(1), Permission::Write).unwrap();
        assert_eq!(lm.pages_locked_by(tid(1)).len(), 2);

        lm.release_all(tid(1));
        assert!(lm.pages_locked_by(tid(1)).is_empty());
        assert_eq!(lm.holders(pid(1)), LockHolders::default());
    }

    #[test]
    fn test_writer_blocks_until_reader_releases() {
        let lm = Arc::new(LockManager::new());
        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();

        let granted = Arc::new(AtomicBool::new(false));
        let handle = {
            let lm = Arc::clone(&lm);
            let granted = Arc::clone(&granted);
            thread::spawn(move || {
                lm.acquire(tid(2), pid(0), Permission::Write).unwrap();
                granted.store(true, Ordering::SeqCst);
            })
        };

        wait_until_blocked(&lm, 1);
        assert!(!granted.load(Ordering::SeqCst));

        lm.release_all(tid(1));
        handle.join().unwrap();
        assert!(granted.load(Ordering::SeqCst));
        assert_eq!(lm.holders(pid(0)).exclusive, Some(tid(2)));
    }

    #[test]
    fn test_two_readers_upgrading_deadlock() {
        let lm = Arc::new(LockManager::new());
        lm.acquire(tid(1), pid(0), Permission::Read).unwrap();
        lm.acquire(tid(2), pid(0), Permission::Read).unwrap();

        let handle = {
            let lm = Arc::clone(&lm);
            thread::spawn(move || {
                let result = lm.acquire(tid(1), pid(0), Permission::Write);
                if result.is_err() {
                    lm.release_all(tid(1));
                }
                result
            })
        };

        wait_until_blocked(&lm, 1);
        let second = lm.acquire(tid(2), pid(0), Permission::Write);
        assert!(matches!(second, Err(Error::Deadlock(t)) if t == tid(2)));

        lm.release_all(tid(2));
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(lm.lock_mode(tid(1), pid(0)), Some(Permission::Write));
    }

    #[test]
    fn test_crossed_writers_exactly_one_fails() {
        let lm = Arc::new(LockManager::new());
        let barrier = Arc::new(Barrier::new(2));

        let run = |me: u64, first: u32, second: u32| {
            let lm = Arc::clone(&lm);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                lm.acquire(tid(me), pid(first), Permission::Write).unwrap();
                barrier.wait();
                let result = lm.acquire(tid(me), pid(second), Permission::Write);
                lm.release_all(tid(me));
                result.is_ok()
            })
        };

        let a = run(1, 0, 1);
        let b = run(2, 1, 0);
        let ok_a = a.join().unwrap();
        let ok_b = b.join().unwrap();

        assert!(ok_a ^ ok_b, "exactly one transaction should be refused");
        assert_eq!(lm.waiting_count(), 0);
    }

    #[test]
    fn test_bystander_waits_instead_of_failing() {
        let lm = Arc::new(LockManager::new());
        lm.acquire(tid(1), pid(0), Permission::Write).unwrap();

        let handle = {
            let lm = Arc::clone(&lm);
            thread::spawn(move || lm.acquire(tid(2), pid(0), Permission::Read))
        };

        wait_until_blocked(&lm, 1);
        lm.release_all(tid(1));
        assert!(handle.join().unwrap().is_ok());
    }
}
