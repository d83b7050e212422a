//! Clock (second-chance) page replacement.

use super::frame::{FrameDescriptor, FrameId};
use crate::storage::Storage;

/// Clock replacement policy.
///
/// Keeps a single hand that rotates over the frame numbers and survives
/// between calls, so successive evictions spread around the pool instead of
/// always rescanning from frame 0.
///
/// Each victim search advances the hand before looking at a frame:
/// - pinned frames are skipped
/// - referenced frames lose their bit and are skipped (second chance)
/// - the first unpinned, unreferenced frame is the victim
///
/// The hand starts at `capacity - 1`, so the very first frame examined is
/// frame 0.
///
/// The replacer only chooses. Writing back and unmapping the victim is the
/// buffer manager's job.
#[derive(Debug)]
pub(crate) struct ClockReplacer {
    hand: usize,
    capacity: usize,
}

impl ClockReplacer {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "clock needs at least one frame");
        Self {
            hand: capacity - 1,
            capacity,
        }
    }

    /// Frame the hand is currently resting on.
    pub(crate) fn hand(&self) -> FrameId {
        FrameId::new(self.hand)
    }

    fn advance(&mut self) -> usize {
        self.hand = (self.hand + 1) % self.capacity;
        self.hand
    }

    /// Finds a victim frame, clearing reference bits along the way.
    ///
    /// Sweeps at most one full revolution, ending back where it started.
    /// Returns `None` if every frame was pinned or referenced. The bits
    /// cleared on the way stay cleared, so a later sweep can succeed.
    pub(crate) fn victim<S: Storage>(
        &mut self,
        descriptors: &mut [FrameDescriptor<S>],
    ) -> Option<FrameId> {
        debug_assert_eq!(descriptors.len(), self.capacity);

        for _ in 0..self.capacity {
            let index = self.advance();
            let desc = &mut descriptors[index];

            if desc.pin_count > 0 {
                continue;
            }

            if desc.referenced {
                desc.referenced = false;
                continue;
            }

            return Some(FrameId::new(index));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemoryStorage, PageId};

    fn descriptors(n: usize) -> (Arc<MemoryStorage>, Vec<FrameDescriptor<MemoryStorage>>) {
        let file = Arc::new(MemoryStorage::new());
        let descs = (0..n)
            .map(|i| {
                let mut desc = FrameDescriptor::new();
                desc.set(Arc::clone(&file), PageId::new(i as u64));
                desc
            })
            .collect();
        (file, descs)
    }

    #[test]
    fn test_first_victim_is_frame_zero() {
        let mut clock = ClockReplacer::new(4);
        let mut descs: Vec<FrameDescriptor<MemoryStorage>> =
            (0..4).map(|_| FrameDescriptor::new()).collect();

        assert_eq!(clock.hand(), FrameId::new(3));
        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(0)));
    }

    #[test]
    fn test_hand_persists_between_calls() {
        let mut clock = ClockReplacer::new(3);
        let mut descs: Vec<FrameDescriptor<MemoryStorage>> =
            (0..3).map(|_| FrameDescriptor::new()).collect();

        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(0)));
        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(1)));
        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(2)));
        // Wraps around.
        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(0)));
    }

    #[test]
    fn test_skips_pinned_frames() {
        let mut clock = ClockReplacer::new(3);
        let (_file, mut descs) = descriptors(3);
        for desc in &mut descs[1..] {
            desc.pin_count = 0;
            desc.referenced = false;
        }

        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(1)));
        assert_eq!(descs[0].pin_count, 1);
    }

    #[test]
    fn test_referenced_frame_gets_second_chance() {
        let mut clock = ClockReplacer::new(3);
        let (_file, mut descs) = descriptors(3);
        for desc in &mut descs {
            desc.pin_count = 0;
            desc.referenced = false;
        }
        descs[0].referenced = true;

        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(1)));
        assert!(!descs[0].referenced, "sweep should clear the bit it skipped");
    }

    #[test]
    fn test_all_referenced_exhausts_one_revolution() {
        let mut clock = ClockReplacer::new(3);
        let (_file, mut descs) = descriptors(3);
        for desc in &mut descs {
            desc.pin_count = 0;
        }

        // One revolution only strips the bits.
        assert_eq!(clock.victim(&mut descs), None);
        assert!(descs.iter().all(|d| !d.referenced));
        assert_eq!(clock.hand(), FrameId::new(2));

        // The next sweep starts past the hand again.
        assert_eq!(clock.victim(&mut descs), Some(FrameId::new(0)));
    }

    #[test]
    fn test_all_pinned_returns_none() {
        let mut clock = ClockReplacer::new(3);
        let (_file, mut descs) = descriptors(3);

        assert_eq!(clock.victim(&mut descs), None);
        // Pinned frames keep their reference bits.
        assert!(descs.iter().all(|d| d.referenced));
    }
}
