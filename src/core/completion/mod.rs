//=========================================================================
// Completion Bus
//=========================================================================
//
// The single narrow channel from any detector to the sequencer.
//
// Pattern: notify_complete(key) → queue → drained at the tick boundary
// with the sequencer's current scene key. Notifications for any other
// key are stale (a detector callback that outlived its scene) and are
// dropped silently. This is the boundary that decouples detection
// algorithms from orchestration.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::Debug;

use log::debug;

//=== CompletionBus =======================================================

/// Queue of scene completion notifications, filtered at drain time.
///
/// Detectors (or external collaborators) push the key of the scene they
/// believe they completed; the sequencer drains with its *current* key.
/// Only matching notifications count, so a completion racing a scene
/// transition resolves to a silent drop rather than a double advance.
pub struct CompletionBus<K> {
    pending: Vec<K>,
}

impl<K: Copy + Eq + Debug> CompletionBus<K> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Records a completion claim for `key`.
    ///
    /// Validity is judged at drain time, not here: the claimant may
    /// already be stale and cannot know it.
    pub fn notify_complete(&mut self, key: K) {
        self.pending.push(key);
    }

    /// Drains every pending notification, returning whether any matched
    /// `current`. Stale notifications are dropped with a debug log.
    pub fn drain_matching(&mut self, current: K) -> bool {
        let mut matched = false;
        for key in self.pending.drain(..) {
            if key == current {
                matched = true;
            } else {
                debug!(
                    "Dropping stale completion for scene {:?} (current is {:?})",
                    key, current
                );
            }
        }
        matched
    }

    /// Discards everything pending without matching.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of undrained notifications.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K: Copy + Eq + Debug> Default for CompletionBus<K> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Tests
//=========================================================================
