//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use unveil_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Sequencer facade
pub use crate::sequencer::{SceneSequencer, SequencerBuilder};

// Scene descriptors
pub use crate::core::scene::{Scene, SceneKey, SceneKind};

// Detector configuration and phases
pub use crate::core::detector::{
    CoverageConfig, CoverageScanner, GestureConfig, GestureThresholdDetector, PatternPhase,
    SequenceConfig, SequenceMatcher, StrokeSegment,
};

// Output and input surfaces
pub use crate::core::event::SequencerEvent;
pub use crate::core::input::{InputEvent, InputFeed};

// Timers
pub use crate::core::timer::{TimerHandle, TimerRegistry};

// Errors
pub use crate::core::error::{ConfigError, ConfigResult};
