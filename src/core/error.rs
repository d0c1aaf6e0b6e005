//=========================================================================
// Configuration Errors
//=========================================================================
//
// Error taxonomy for engine configuration.
//
// Configuration errors are the only error class that reaches callers.
// Runtime races (stale timers, out-of-phase input, late detector
// callbacks) are resolved internally and never surface as errors.
//
//=========================================================================

/// Convenience result type for configuration APIs.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors rejected at construction time.
///
/// Every variant describes an invalid configuration; none of them can
/// occur once a sequencer or detector has been successfully built.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A sequencer needs at least one scene.
    #[error("scene list is empty")]
    EmptySceneList,

    /// A `Timed` scene has no detector, so it must carry an
    /// auto-advance deadline or it could never complete.
    #[error("timed scene {0} has no auto-advance deadline")]
    MissingAutoAdvance(String),

    /// The pattern game needs at least one pad to flash.
    #[error("pad count must be at least 1")]
    NoPads,

    /// A pattern scene must play at least one round.
    #[error("round list is empty")]
    EmptyRounds,

    /// A round of length zero has nothing to show or match.
    #[error("round {index} has length 0")]
    ZeroLengthRound { index: usize },

    /// Difficulty must ramp: each round strictly longer than the last.
    #[error("round {index} (length {length}) does not increase on the previous round (length {previous})")]
    NonIncreasingRounds {
        index: usize,
        length: usize,
        previous: usize,
    },

    /// Playback timing values must be positive and consistent.
    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    /// A fractional threshold fell outside its valid range.
    #[error("threshold {value} outside valid range {range}")]
    InvalidThreshold { value: f32, range: &'static str },

    /// The gesture container extent must be a positive length.
    #[error("container extent must be positive, got {0}")]
    InvalidExtent(f32),

    /// A coverage surface must contain at least one pixel.
    #[error("coverage surface has zero area ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidTiming`] value.
    pub fn timing(msg: impl Into<String>) -> Self {
        Self::InvalidTiming(msg.into())
    }
}

//=========================================================================
// Tests
//=========================================================================
