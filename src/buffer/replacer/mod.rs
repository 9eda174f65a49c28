//! Eviction policy.
//!
//! - [`ClockReplacer`] - CLOCK (second chance) over the pool's frames

mod clock;

pub use clock::ClockReplacer;
