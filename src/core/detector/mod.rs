//=========================================================================
// Input Detectors
//=========================================================================
//
// Converts raw input streams into scene completion decisions.
//
// Architecture:
//   raw input → detector state machine → detector events → sequencer
//
// Each detector is an explicit finite-state machine that owns its own
// state and timing. "Already completed" is a state, never a side-channel
// flag, and every detector treats out-of-phase input as an idempotent
// no-op rather than an error.
//
//=========================================================================

//=== Module Declarations =================================================

mod coverage;
mod gesture;
mod sequence_matcher;

//=== Public API ==========================================================

pub use coverage::{CoverageConfig, CoverageEvent, CoverageScanner, StrokeSegment};
pub use gesture::{GestureConfig, GestureEvent, GesturePhase, GestureThresholdDetector};
pub use sequence_matcher::{MatcherEvent, PatternPhase, SequenceConfig, SequenceMatcher};
