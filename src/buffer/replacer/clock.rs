//! CLOCK (second chance) replacement policy.

use crate::common::FrameId;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    tracked: bool,
    referenced: bool,
}

/// CLOCK eviction over a fixed set of frames.
///
/// Every tracked frame has a reference bit, set on each access. The hand
/// sweeps the frames in order: a referenced frame loses its bit and is
/// skipped, an unreferenced one is the victim. Pinned frames are skipped
/// without touching their bit.
///
/// The replacer does not track pin counts itself; [`evict`](Self::evict)
/// asks the caller.
pub struct ClockReplacer {
    slots: Vec<Slot>,
    hand: usize,
    tracked: usize,
}

impl ClockReplacer {
    /// Create a replacer for frames `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
            hand: 0,
            tracked: 0,
        }
    }

    /// Record that a frame was accessed, starting to track it if needed.
    pub fn record_access(&mut self, frame_id: FrameId) {
        let slot = &mut self.slots[frame_id.index()];
        if !slot.tracked {
            slot.tracked = true;
            self.tracked += 1;
        }
        slot.referenced = true;
    }

    /// Stop tracking a frame.
    pub fn remove(&mut self, frame_id: FrameId) {
        let slot = &mut self.slots[frame_id.index()];
        if slot.tracked {
            *slot = Slot::default();
            self.tracked -= 1;
        }
    }

    /// Select and stop tracking a victim frame.
    ///
    /// Returns `None` if every tracked frame is pinned.
    pub fn evict(&mut self, is_pinned: impl Fn(FrameId) -> bool) -> Option<FrameId> {
        let n = self.slots.len();
        // Two sweeps: the first may only clear reference bits.
        for _ in 0..2 * n {
            let frame_id = FrameId::new(self.hand);
            self.hand = (self.hand + 1) % n;

            let slot = &mut self.slots[frame_id.index()];
            if !slot.tracked || is_pinned(frame_id) {
                continue;
            }
            if slot.referenced {
                slot.referenced = false;
                continue;
            }

            *slot = Slot::default();
            self.tracked -= 1;
            return Some(frame_id);
        }
        None
    }

    /// Number of tracked frames, pinned or not.
    pub fn size(&self) -> usize {
        self.tracked
    }
}
