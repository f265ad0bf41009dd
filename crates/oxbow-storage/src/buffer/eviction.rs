//! CLOCK eviction policy for the buffer pool.
//!
//! The Clock algorithm is a simple and efficient approximation of LRU
//! that uses a reference bit instead of maintaining an ordered list.
//!
//! How it works:
//! 1. A frame enters the candidate set with its reference bit set when its
//!    last pin is released
//! 2. A clock hand sweeps the frames looking for eviction candidates
//! 3. A candidate with its reference bit set loses the bit and is passed
//!    over once (its second chance)
//! 4. A candidate with a clear reference bit is the victim
//!
//! The replacer owns its bookkeeping: which frames are currently
//! candidates, their reference bits, and the hand position. The buffer pool
//! tells it about pins and unpins; it never inspects frames itself.

use parking_lot::Mutex;

use super::frame::FrameId;

/// Per-frame replacer state.
#[derive(Clone, Copy, Default)]
struct ClockSlot {
    /// Frame is currently an eviction candidate.
    in_set: bool,
    /// Second-chance bit, set on unpin and cleared by a passing hand.
    referenced: bool,
}

/// Clock replacer state: the hand plus one slot per frame.
struct ClockState {
    hand: usize,
    slots: Box<[ClockSlot]>,
}

/// CLOCK (second-chance) page replacement.
///
/// Victim selection is deterministic given the hand position and the slot
/// bits: the first unreferenced candidate at or after the hand wins; if a
/// full revolution finds only referenced candidates, the first of them
/// (now stripped of its reference bit) is taken instead. The hand always
/// advances to the position after the returned victim.
pub struct ClockReplacer {
    state: Mutex<ClockState>,
}

impl ClockReplacer {
    /// Creates a replacer tracking `num_frames` frames, none of which are
    /// candidates yet.
    #[must_use]
    pub fn new(num_frames: usize) -> Self {
        Self {
            state: Mutex::new(ClockState {
                hand: 0,
                slots: vec![ClockSlot::default(); num_frames].into_boxed_slice(),
            }),
        }
    }

    /// Selects and removes a victim from the candidate set.
    ///
    /// Returns `None` if no frame is currently a candidate.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let num_frames = state.slots.len();
        if num_frames == 0 {
            return None;
        }

        let mut fallback: Option<usize> = None;
        for step in 0..num_frames {
            let pos = (state.hand + step) % num_frames;
            let slot = state.slots[pos];

            if slot.in_set && !slot.referenced {
                state.slots[pos].in_set = false;
                state.hand = (pos + 1) % num_frames;
                return Some(FrameId::new(pos));
            }
            if slot.in_set && slot.referenced {
                // Second chance: strip the bit, remember the first such
                // frame in case the whole revolution comes up empty.
                state.slots[pos].referenced = false;
                if fallback.is_none() {
                    fallback = Some(pos);
                }
            }
        }

        let pos = fallback?;
        state.slots[pos].in_set = false;
        state.hand = (pos + 1) % num_frames;
        Some(FrameId::new(pos))
    }

    /// Removes a frame from the candidate set.
    ///
    /// Called when the frame gains a pin. Idempotent; out-of-range frames
    /// are ignored.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.get_mut(frame_id.index()) {
            slot.in_set = false;
        }
    }

    /// Adds a frame to the candidate set with its reference bit set.
    ///
    /// Called when the frame's pin count returns to zero. Idempotent in
    /// the sense that repeated calls leave the frame in and referenced;
    /// out-of-range frames are ignored.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.get_mut(frame_id.index()) {
            slot.in_set = true;
            slot.referenced = true;
        }
    }

    /// Returns the number of frames currently in the candidate set.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.in_set)
            .count()
    }
}

impl std::fmt::Debug for ClockReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClockReplacer")
            .field("num_frames", &state.slots.len())
            .field("hand", &state.hand)
            .field(
                "candidates",
                &state.slots.iter().filter(|slot| slot.in_set).count(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_replacer_has_no_victim() {
        let replacer = ClockReplacer::new(10);
        assert_eq!(replacer.victim(), None);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_freshly_unpinned_frames_fall_back_to_first() {
        // Three frames, all just unpinned: every candidate still holds its
        // reference bit, so one full revolution strips the bits and the
        // first candidate seen is taken as the fallback victim.
        let replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));
        replacer.unpin(FrameId::new(2));
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        assert_eq!(replacer.size(), 2);
    }

    #[test]
    fn test_unreferenced_candidate_wins_over_fallback() {
        let replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));
        replacer.unpin(FrameId::new(2));

        // First victim strips the remaining reference bits...
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        // ...so the next scan finds frame 1 unreferenced directly.
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_removes_candidate() {
        let replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));

        replacer.pin(FrameId::new(0));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_is_idempotent() {
        let replacer = ClockReplacer::new(3);
        replacer.pin(FrameId::new(1));
        replacer.pin(FrameId::new(1));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_unpin_is_idempotent() {
        let replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId::new(1));
        replacer.unpin(FrameId::new(1));
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_out_of_range_frames_ignored() {
        let replacer = ClockReplacer::new(3);
        replacer.unpin(FrameId::new(7));
        replacer.pin(FrameId::new(7));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_hand_advances_past_victim() {
        let replacer = ClockReplacer::new(4);
        for i in 0..4 {
            replacer.unpin(FrameId::new(i));
        }

        // Fallback victim is frame 0; the hand now sits on frame 1, so the
        // re-unpinned frame 0 is scanned last and the next victim is 1.
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
        replacer.unpin(FrameId::new(0));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_second_chance_survives_one_sweep() {
        let replacer = ClockReplacer::new(2);
        replacer.unpin(FrameId::new(0));
        replacer.unpin(FrameId::new(1));

        // Sweep strips both bits and falls back to frame 0.
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));

        // Re-unpinning frame 1 re-arms its reference bit, but frame 1 is
        // the only candidate, so the fallback takes it anyway.
        replacer.unpin(FrameId::new(1));
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.size(), 0);
    }
}
