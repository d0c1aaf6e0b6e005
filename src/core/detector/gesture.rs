//=========================================================================
// Gesture Threshold Detector
//=========================================================================
//
// Converts a raw pointer-drag stream into a binary open/closed decision
// plus continuous progress for visual feedback.
//
// State machine:
//   Idle → Dragging → Idle (snap back)
//                   ↘ Committed (permanent)
//
// Progress is normalized against (container extent × threshold
// fraction), so 1.0 means "threshold reached". The peak value over the
// whole gesture decides the outcome: a crossing mid-drag commits even
// if the pointer retreats before release.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::error::{ConfigError, ConfigResult};

//=== GestureConfig =======================================================

/// Configuration for a drag-to-open gesture.
#[derive(Debug, Clone, Copy)]
pub struct GestureConfig {
    /// Size of the container the drag is measured against, in the same
    /// units as the pointer coordinates.
    pub container_extent: f32,

    /// Fraction of the container the drag must cross to open. In (0, 1].
    pub threshold_fraction: f32,
}

impl GestureConfig {
    /// Creates a config with the reference threshold of 35%.
    pub fn new(container_extent: f32) -> Self {
        Self {
            container_extent,
            threshold_fraction: 0.35,
        }
    }

    /// Overrides the threshold fraction.
    pub fn with_threshold(mut self, fraction: f32) -> Self {
        self.threshold_fraction = fraction;
        self
    }

    /// Rejects invalid configurations.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.container_extent.is_finite() && self.container_extent > 0.0) {
            return Err(ConfigError::InvalidExtent(self.container_extent));
        }
        if !(self.threshold_fraction.is_finite()
            && self.threshold_fraction > 0.0
            && self.threshold_fraction <= 1.0)
        {
            return Err(ConfigError::InvalidThreshold {
                value: self.threshold_fraction,
                range: "(0, 1]",
            });
        }
        Ok(())
    }
}

//=== Phase & Events ======================================================

/// Current phase of the gesture detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    /// No drag in flight.
    Idle,

    /// Pointer is down and moving.
    Dragging,

    /// The threshold was crossed; the decision is permanent.
    Committed,
}

/// Events emitted by the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Normalized progress in [0, 1] for visual feedback.
    Progress(f32),

    /// The gesture crossed the threshold. Emitted exactly once.
    Committed,

    /// The gesture ended below the threshold; the visual should
    /// spring back to rest.
    SnappedBack,
}

//=== GestureThresholdDetector ============================================

/// Decides snap-open vs. snap-back for a continuous drag gesture.
///
/// Move events may arrive at any rate, including zero times between a
/// start and an end. Commitment is permanent and idempotent: once
/// committed, every further pointer event is a no-op. An aborted
/// gesture behaves exactly like a release at the last observed position.
#[derive(Debug)]
pub struct GestureThresholdDetector {
    config: GestureConfig,
    phase: GesturePhase,
    origin: (f32, f32),
    progress: f32,
    peak: f32,
}

impl GestureThresholdDetector {
    //--- Construction -----------------------------------------------------

    /// Creates a detector, rejecting invalid configuration.
    pub fn new(config: GestureConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            phase: GesturePhase::Idle,
            origin: (0.0, 0.0),
            progress: 0.0,
            peak: 0.0,
        })
    }

    //--- Pointer Stream ---------------------------------------------------

    /// Begins a drag at `(x, y)`. Resets progress for the new stroke.
    pub fn drag_start(&mut self, x: f32, y: f32) -> Vec<GestureEvent> {
        if self.phase == GesturePhase::Committed {
            return Vec::new();
        }
        self.phase = GesturePhase::Dragging;
        self.origin = (x, y);
        self.progress = 0.0;
        self.peak = 0.0;
        vec![GestureEvent::Progress(0.0)]
    }

    /// Updates progress from the current pointer position.
    pub fn drag_move(&mut self, x: f32, y: f32) -> Vec<GestureEvent> {
        if self.phase != GesturePhase::Dragging {
            return Vec::new();
        }
        let dx = x - self.origin.0;
        let dy = y - self.origin.1;
        let distance = (dx * dx + dy * dy).sqrt();
        let span = self.config.container_extent * self.config.threshold_fraction;
        self.progress = (distance / span).clamp(0.0, 1.0);
        self.peak = self.peak.max(self.progress);
        vec![GestureEvent::Progress(self.progress)]
    }

    /// Ends the drag, deciding its outcome from the peak progress.
    pub fn drag_end(&mut self) -> Vec<GestureEvent> {
        if self.phase != GesturePhase::Dragging {
            // Already committed, or no drag in flight.
            return Vec::new();
        }
        if self.peak >= 1.0 {
            debug!("Gesture committed (peak progress {:.3})", self.peak);
            self.phase = GesturePhase::Committed;
            vec![GestureEvent::Committed]
        } else {
            debug!("Gesture snapped back (peak progress {:.3})", self.peak);
            self.phase = GesturePhase::Idle;
            vec![GestureEvent::SnappedBack]
        }
    }

    /// Pointer-cancel behaves identically to a release at the last
    /// observed position.
    pub fn drag_cancel(&mut self) -> Vec<GestureEvent> {
        self.drag_end()
    }

    //--- Queries ----------------------------------------------------------

    /// Current phase.
    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Last computed progress, in [0, 1].
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// True once the gesture has committed.
    pub fn is_committed(&self) -> bool {
        self.phase == GesturePhase::Committed
    }
}

//=========================================================================
// Tests
//=========================================================================
