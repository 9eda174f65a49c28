//! Frame identifier type.

use std::fmt;

/// Index of a frame (cache slot) in the buffer pool.
///
/// Frames live in a fixed `Vec` allocated when the pool is built, so a
/// `FrameId` is a plain index into it and stays valid for the pool's lifetime.
/// Which page a frame holds changes over time; see the pool's page table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Create a new FrameId.
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    /// The index into the pool's frame vector.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_index() {
        assert_eq!(FrameId::new(10).index(), 10);
    }

    #[test]
    fn test_frame_id_display() {
        assert_eq!(format!("{}", FrameId::new(42)), "Frame(42)");
    }
}
