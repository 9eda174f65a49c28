//! Wait-for graph over blocked transactions.
//!
//! An edge `a → b` means transaction `a` is blocked on a lock that `b`
//! holds. A cycle means deadlock.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::common::TransactionId;

/// Directed graph of waiting transactions.
///
/// Each waiter has exactly one outstanding request, so its out-edges are
/// replaced wholesale every time it blocks and dropped when it stops
/// blocking.
#[derive(Debug, Default)]
pub struct WaitForGraph {
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `waiter` is blocked on every transaction in `holders`.
    ///
    /// Self-edges are ignored.
    pub fn set_waiting(&mut self, waiter: TransactionId, holders: HashSet<TransactionId>) {
        let mut holders = holders;
        holders.remove(&waiter);
        if holders.is_empty() {
            self.edges.remove(&waiter);
        } else {
            self.edges.insert(waiter, holders);
        }
    }

    /// Drop all out-edges of `waiter`.
    pub fn clear_waiting(&mut self, waiter: TransactionId) {
        self.edges.remove(&waiter);
    }

    /// Drop every edge touching `tid`, in either direction.
    pub fn remove_transaction(&mut self, tid: TransactionId) {
        self.edges.remove(&tid);
        self.edges.retain(|_, holders| {
            holders.remove(&tid);
            !holders.is_empty()
        });
    }

    /// Drop every edge.
    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Whether `tid` lies on a cycle, i.e. can reach itself by following
    /// wait-for edges.
    ///
    /// Transactions merely waiting on a cycle, or waited on by one, are not
    /// deadlocked themselves. Iterative, so long wait chains cannot overflow
    /// the stack.
    pub fn is_deadlocked(&self, tid: TransactionId) -> bool {
        let mut seen: HashSet<TransactionId> = HashSet::new();
        let mut queue: VecDeque<TransactionId> = self.out_edges(tid).collect();

        while let Some(next) = queue.pop_front() {
            if next == tid {
                return true;
            }
            if seen.insert(next) {
                queue.extend(self.out_edges(next));
            }
        }
        false
    }

    fn out_edges(&self, tid: TransactionId) -> impl Iterator<Item = TransactionId> + '_ {
        self.edges.get(&tid).into_iter().flatten().copied()
    }
}

#[cfg(test)]
impl WaitForGraph {
    fn waits_for(&self, waiter: TransactionId) -> Option<&HashSet<TransactionId>> {
        self.edges.get(&waiter)
    }

    fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Kahn sweep: a cycle exists iff some node never reaches in-degree 0.
    fn has_cycle(&self) -> bool {
        let mut in_degree: HashMap<TransactionId, usize> = HashMap::new();
        for (&from, targets) in &self.edges {
            in_degree.entry(from).or_insert(0);
            for &to in targets {
                *in_degree.entry(to).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<TransactionId> =
            in_degree.iter().filter(|(_, &deg)| deg == 0).map(|(&tid, _)| tid).collect();
        let mut removed = 0;
        while let Some(tid) = queue.pop_front() {
            removed += 1;
            for to in self.out_edges(tid) {
                if let Some(deg) = in_degree.get_mut(&to) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(to);
                    }
                }
            }
        }
        removed < in_degree.len()
    }
}
