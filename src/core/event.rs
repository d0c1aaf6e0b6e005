//=========================================================================
// Sequencer Events
//=========================================================================
//
// The output surface of the engine.
//
// The rendering layer (out of scope) consumes these to drive visuals:
// pad lights, drawer offsets, scratch overlays, scene swaps. Events are
// emitted from `tick` and the direct input methods in the order the
// underlying signals resolved.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::detector::PatternPhase;
use crate::core::scene::SceneKey;

//=== SequencerEvent ======================================================

/// Events emitted by the sequencer for the display layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequencerEvent<K: SceneKey> {
    /// The pattern game in `scene` changed phase.
    ScenePhaseChanged { scene: K, phase: PatternPhase },

    /// Light (`lit = true`) or dim a pad during pattern playback.
    PadHighlight { scene: K, pad: usize, lit: bool },

    /// Continuous drag progress in [0, 1] for visual feedback.
    GestureProgress(f32),

    /// The drag gesture resolved: `true` opened, `false` snapped back.
    GestureCommitted(bool),

    /// Updated revealed fraction of the coverage surface, in [0, 1].
    RevealedFraction(f32),

    /// The coverage threshold was crossed. Emitted exactly once per scene.
    CoverageCompleted,

    /// A scene finished and was exited.
    SceneCompleted(K),

    /// The whole sequence reached its terminal state.
    SequenceDone,
}
