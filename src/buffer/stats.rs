//! Counters kept by the buffer pool.
//!
//! Cache behaviour (hits, misses, evictions), disk traffic, and transaction
//! outcomes are all counted here. Read them through [`BufferPoolStats::snapshot`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, bumped by the pool as it works.
///
/// Each counter is its own relaxed atomic, so a snapshot taken while other
/// threads run is not a consistent cut.
///
/// # Example
/// ```
/// use heapstore::BufferPoolStats;
///
/// let stats = BufferPoolStats::new();
/// assert_eq!(stats.snapshot().lookups(), 0);
/// ```
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Lookups served from a cached frame.
    pub cache_hits: AtomicU64,
    /// Lookups that went to the heap file.
    pub cache_misses: AtomicU64,
    pub evictions: AtomicU64,
    pub pages_read: AtomicU64,
    /// Includes logged steals, flushes, commits and abort write-backs.
    pub pages_written: AtomicU64,
    /// Pages restored from a before-image on abort, cached or evicted.
    pub pages_rolled_back: AtomicU64,
    pub commits: AtomicU64,
    pub aborts: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> [&AtomicU64; 8] {
        [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.pages_read,
            &self.pages_written,
            &self.pages_rolled_back,
            &self.commits,
            &self.aborts,
        ]
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let [
            cache_hits,
            cache_misses,
            evictions,
            pages_read,
            pages_written,
            pages_rolled_back,
            commits,
            aborts,
        ] = self.counters().map(|c| c.load(Ordering::Relaxed));
        StatsSnapshot {
            cache_hits,
            cache_misses,
            evictions,
            pages_read,
            pages_written,
            pages_rolled_back,
            commits,
            aborts,
        }
    }

    /// Shorthand for `snapshot().hit_rate()`.
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Plain copy of the counters at one moment.
///
/// # Example
/// ```
/// use heapstore::StatsSnapshot;
///
/// let before = StatsSnapshot { cache_misses: 2, ..Default::default() };
/// let after = StatsSnapshot { cache_hits: 6, cache_misses: 4, ..Default::default() };
///
/// let window = after.since(&before);
/// assert_eq!(window.lookups(), 8);
/// assert_eq!(window.hit_rate(), 0.75);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_rolled_back: u64,
    pub commits: u64,
    pub aborts: u64,
}

impl StatsSnapshot {
    /// Total page lookups, hit or miss.
    pub fn lookups(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }

    /// Fraction of lookups served from cache; 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.cache_hits as f64 / n as f64,
        }
    }

    /// Counts accumulated between `earlier` and `self`.
    ///
    /// Saturates at zero if the stats were reset in between.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.saturating_sub(earlier.cache_hits),
            cache_misses: self.cache_misses.saturating_sub(earlier.cache_misses),
            evictions: self.evictions.saturating_sub(earlier.evictions),
            pages_read: self.pages_read.saturating_sub(earlier.pages_read),
            pages_written: self.pages_written.saturating_sub(earlier.pages_written),
            pages_rolled_back: self.pages_rolled_back.saturating_sub(earlier.pages_rolled_back),
            commits: self.commits.saturating_sub(earlier.commits),
            aborts: self.aborts.saturating_sub(earlier.aborts),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lookups={} hit_rate={:.1}% evictions={} io(r/w)={}/{} txns(commit/abort)={}/{} rolled_back={}",
            self.lookups(),
            self.hit_rate() * 100.0,
            self.evictions,
            self.pages_read,
            self.pages_written,
            self.commits,
            self.aborts,
            self.pages_rolled_back
        )
    }
}
