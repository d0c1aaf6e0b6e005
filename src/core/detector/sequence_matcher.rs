//=========================================================================
// Sequence Matcher
//=========================================================================
//
// "Watch, then repeat" pattern rounds with a difficulty ramp.
//
// Round lifecycle:
//   Showing → AwaitingInput → Success (next round, or Completed)
//                           ↘ Miss → replay the same round
//
// Each round's pad sequence is generated once, uniformly at random, and
// is immutable while it plays; a miss replays the identical sequence
// (deterministic retry). All playback timing runs through the matcher's
// own TimerRegistry, so `abort()` tears the whole round down in one
// generation cancel.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

//=== Internal Dependencies ===============================================

use crate::core::error::{ConfigError, ConfigResult};
use crate::core::timer::TimerRegistry;

//=== SequenceConfig ======================================================

/// Configuration for one pattern-game scene.
///
/// `round_lengths` defines the difficulty ramp: one entry per round,
/// strictly increasing. Validation happens at construction, never at
/// runtime.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Number of distinct pads a step can land on.
    pub pad_count: usize,

    /// Length of each successive round's sequence. Strictly increasing.
    pub round_lengths: Vec<usize>,

    /// Delay between successive playback steps, in milliseconds.
    pub step_ms: f64,

    /// How long a pad stays lit within one step. Must not exceed `step_ms`.
    pub lit_ms: f64,

    /// Settle delay between the last playback step and input opening.
    pub settle_ms: f64,

    /// Pause after Success/Miss before the next Showing begins.
    pub pause_ms: f64,

    /// Optional RNG seed for deterministic round generation.
    pub seed: Option<u64>,
}

impl SequenceConfig {
    /// Creates a config with the default playback timing.
    pub fn new(pad_count: usize, round_lengths: Vec<usize>) -> Self {
        Self {
            pad_count,
            round_lengths,
            step_ms: 600.0,
            lit_ms: 420.0,
            settle_ms: 350.0,
            pause_ms: 800.0,
            seed: None,
        }
    }

    /// Sets a fixed RNG seed, making round generation deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects invalid configurations.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pad_count == 0 {
            return Err(ConfigError::NoPads);
        }
        if self.round_lengths.is_empty() {
            return Err(ConfigError::EmptyRounds);
        }
        for (index, &length) in self.round_lengths.iter().enumerate() {
            if length == 0 {
                return Err(ConfigError::ZeroLengthRound { index });
            }
            if index > 0 {
                let previous = self.round_lengths[index - 1];
                if length <= previous {
                    return Err(ConfigError::NonIncreasingRounds {
                        index,
                        length,
                        previous,
                    });
                }
            }
        }
        if !(self.step_ms.is_finite() && self.step_ms > 0.0) {
            return Err(ConfigError::timing(format!(
                "step_ms must be positive, got {}",
                self.step_ms
            )));
        }
        if !(self.lit_ms.is_finite() && self.lit_ms > 0.0) {
            return Err(ConfigError::timing(format!(
                "lit_ms must be positive, got {}",
                self.lit_ms
            )));
        }
        if self.lit_ms > self.step_ms {
            return Err(ConfigError::timing(format!(
                "lit_ms ({}) exceeds step_ms ({})",
                self.lit_ms, self.step_ms
            )));
        }
        if !(self.settle_ms.is_finite() && self.settle_ms >= 0.0) {
            return Err(ConfigError::timing("settle_ms must be non-negative"));
        }
        if !(self.pause_ms.is_finite() && self.pause_ms >= 0.0) {
            return Err(ConfigError::timing("pause_ms must be non-negative"));
        }
        Ok(())
    }
}

//=== Phases & Events =====================================================

/// Externally visible phase of the pattern game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternPhase {
    /// The round's sequence is being replayed to the user.
    Showing,

    /// The user may submit pad presses.
    AwaitingInput,

    /// The round was reproduced correctly.
    Success,

    /// A submission mismatched; the round will replay.
    Miss,
}

/// Events emitted by the matcher, to be forwarded to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherEvent {
    /// The game moved to a new phase.
    Phase(PatternPhase),

    /// Light the given pad.
    Highlight(usize),

    /// Dim the given pad.
    Unhighlight(usize),

    /// All rounds cleared; the scene as a whole is complete.
    Completed,
}

//=== Internal Types ======================================================

// Delayed playback effects, delivered by the matcher's timer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackTick {
    Light(usize),
    Dim(usize),
    OpenInput,
    NextRound,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatcherState {
    Idle,
    Showing,
    AwaitingInput,
    // Between a Success/Miss and the next Showing; input is closed.
    Paused,
    Done,
}

//=== SequenceMatcher =====================================================

/// Drives multi-round "watch, then repeat" gameplay.
///
/// Construct with a validated [`SequenceConfig`], call
/// [`begin`](Self::begin) at scene entry, then drive with
/// [`tick`](Self::tick) (logical clock) and [`submit`](Self::submit)
/// (pad presses). Submissions outside `AwaitingInput` are idempotent
/// no-ops. [`Completed`](MatcherEvent::Completed) is emitted exactly once.
pub struct SequenceMatcher {
    config: SequenceConfig,
    rng: StdRng,
    timers: TimerRegistry<PlaybackTick>,
    state: MatcherState,
    round_index: usize,
    sequence: Vec<usize>,
    cursor: usize,
}

impl SequenceMatcher {
    //--- Construction -----------------------------------------------------

    /// Creates a matcher, rejecting invalid configuration.
    pub fn new(config: SequenceConfig) -> ConfigResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            config,
            rng,
            timers: TimerRegistry::new(),
            state: MatcherState::Idle,
            round_index: 0,
            sequence: Vec::new(),
            cursor: 0,
        })
    }

    //--- Lifecycle --------------------------------------------------------

    /// Starts round 0 at logical time `now_ms`.
    ///
    /// Calling `begin` on a matcher that already started is ignored.
    pub fn begin(&mut self, now_ms: u64) -> Vec<MatcherEvent> {
        if self.state != MatcherState::Idle {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.timers.advance_to(now_ms);
        self.round_index = 0;
        self.generate_round();
        self.start_showing(&mut out);
        out
    }

    /// Tears down all pending playback. Total and synchronous: no
    /// playback tick scheduled before the abort will ever surface.
    pub fn abort(&mut self) {
        let gen = self.timers.generation();
        self.timers.cancel_all(gen);
        self.timers.bump_generation();
        self.state = MatcherState::Idle;
    }

    //--- Driving ----------------------------------------------------------

    /// Advances the logical clock, processing due playback steps.
    pub fn tick(&mut self, now_ms: u64) -> Vec<MatcherEvent> {
        let mut out = Vec::new();
        for tick in self.timers.advance_to(now_ms) {
            self.apply_tick(tick, &mut out);
        }
        out
    }

    /// Submits a pad press at logical time `now_ms`.
    ///
    /// Due playback steps are processed first, so a press arriving in
    /// the same tick as `OpenInput` is accepted. Presses outside
    /// `AwaitingInput` are no-ops.
    pub fn submit(&mut self, pad: usize, now_ms: u64) -> Vec<MatcherEvent> {
        let mut out = self.tick(now_ms);

        if self.state != MatcherState::AwaitingInput {
            debug!("Ignoring pad {} submitted outside AwaitingInput", pad);
            return out;
        }

        if pad == self.sequence[self.cursor] {
            self.cursor += 1;
            if self.cursor == self.sequence.len() {
                self.handle_round_cleared(&mut out);
            }
        } else {
            self.handle_miss(pad, &mut out);
        }
        out
    }

    //--- Queries ----------------------------------------------------------

    /// The sequence of the round currently in play.
    pub fn current_sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Index of the round currently in play.
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// True once every round has been cleared.
    pub fn is_complete(&self) -> bool {
        self.state == MatcherState::Done
    }

    //--- Internal Helpers -------------------------------------------------

    fn generate_round(&mut self) {
        let length = self.config.round_lengths[self.round_index];
        // Uniform per step; adjacent repeats are allowed (fair die).
        self.sequence = (0..length)
            .map(|_| self.rng.random_range(0..self.config.pad_count))
            .collect();
        debug!(
            "Generated round {} sequence {:?}",
            self.round_index, self.sequence
        );
    }

    fn start_showing(&mut self, out: &mut Vec<MatcherEvent>) {
        // Any pending playback of a previous phase dies here.
        let gen = self.timers.generation();
        self.timers.cancel_all(gen);
        self.timers.bump_generation();

        let step = self.config.step_ms;
        let lit = self.config.lit_ms;
        for (i, &pad) in self.sequence.iter().enumerate() {
            let at = i as f64 * step;
            self.timers.schedule(at, PlaybackTick::Light(pad));
            self.timers.schedule(at + lit, PlaybackTick::Dim(pad));
        }
        let last_dim = (self.sequence.len() - 1) as f64 * step + lit;
        self.timers
            .schedule(last_dim + self.config.settle_ms, PlaybackTick::OpenInput);

        self.state = MatcherState::Showing;
        self.cursor = 0;
        out.push(MatcherEvent::Phase(PatternPhase::Showing));
    }

    fn apply_tick(&mut self, tick: PlaybackTick, out: &mut Vec<MatcherEvent>) {
        match tick {
            PlaybackTick::Light(pad) => out.push(MatcherEvent::Highlight(pad)),
            PlaybackTick::Dim(pad) => out.push(MatcherEvent::Unhighlight(pad)),
            PlaybackTick::OpenInput => {
                self.state = MatcherState::AwaitingInput;
                self.cursor = 0;
                out.push(MatcherEvent::Phase(PatternPhase::AwaitingInput));
            }
            PlaybackTick::NextRound => {
                self.round_index += 1;
                self.generate_round();
                self.start_showing(out);
            }
            PlaybackTick::Replay => {
                // Same sequence, deterministic retry.
                self.start_showing(out);
            }
        }
    }

    fn handle_round_cleared(&mut self, out: &mut Vec<MatcherEvent>) {
        out.push(MatcherEvent::Phase(PatternPhase::Success));

        if self.round_index + 1 == self.config.round_lengths.len() {
            debug!("Final round {} cleared", self.round_index);
            self.state = MatcherState::Done;
            let gen = self.timers.generation();
            self.timers.cancel_all(gen);
            out.push(MatcherEvent::Completed);
        } else {
            debug!("Round {} cleared, escalating", self.round_index);
            self.state = MatcherState::Paused;
            self.timers
                .schedule(self.config.pause_ms, PlaybackTick::NextRound);
        }
    }

    fn handle_miss(&mut self, pad: usize, out: &mut Vec<MatcherEvent>) {
        debug!(
            "Miss: pad {} submitted, expected {} at cursor {}",
            pad, self.sequence[self.cursor], self.cursor
        );
        out.push(MatcherEvent::Phase(PatternPhase::Miss));
        self.state = MatcherState::Paused;
        self.timers
            .schedule(self.config.pause_ms, PlaybackTick::Replay);
    }
}

// Timer storage and the rng are omitted; gameplay state summarizes them.
impl std::fmt::Debug for SequenceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceMatcher")
            .field("state", &self.state)
            .field("round_index", &self.round_index)
            .field("cursor", &self.cursor)
            .field("sequence", &self.sequence)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pads: usize, rounds: Vec<usize>) -> SequenceConfig {
        SequenceConfig::new(pads, rounds).with_seed(7)
    }

    // Drives the clock until input opens, returning all emitted events.
    fn run_until_input_open(matcher: &mut SequenceMatcher, from_ms: u64) -> Vec<MatcherEvent> {
        let mut out = Vec::new();
        let mut t = from_ms;
        for _ in 0..100 {
            out.extend(matcher.tick(t));
            if out.contains(&MatcherEvent::Phase(PatternPhase::AwaitingInput)) {
                return out;
            }
            t += 250;
        }
        panic!("input never opened; events so far: {:?}", out);
    }

    //--- Config Validation Tests ------------------------------------------

    #[test]
    fn rejects_zero_pads() {
        let err = SequenceMatcher::new(config(0, vec![2])).unwrap_err();
        assert_eq!(err, ConfigError::NoPads);
    }

    #[test]
    fn rejects_empty_rounds() {
        let err = SequenceMatcher::new(config(4, vec![])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyRounds);
    }

    #[test]
    fn rejects_zero_length_round() {
        let err = SequenceMatcher::new(config(4, vec![2, 0])).unwrap_err();
        assert_eq!(err, ConfigError::ZeroLengthRound { index: 1 });
    }

    #[test]
    fn rejects_non_increasing_rounds() {
        let err = SequenceMatcher::new(config(4, vec![2, 2])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NonIncreasingRounds {
                index: 1,
                length: 2,
                previous: 2
            }
        );
    }

    #[test]
    fn rejects_lit_longer_than_step() {
        let mut cfg = config(4, vec![2]);
        cfg.lit_ms = cfg.step_ms + 1.0;
        assert!(matches!(
            SequenceMatcher::new(cfg),
            Err(ConfigError::InvalidTiming(_))
        ));
    }

    //--- Playback Tests ---------------------------------------------------

    #[test]
    fn debug_output_summarizes_state() {
        let mut matcher = SequenceMatcher::new(config(4, vec![2])).unwrap();
        matcher.begin(0);

        let text = format!("{:?}", matcher);
        assert!(text.contains("SequenceMatcher"));
        assert!(text.contains("state: Showing"));
    }

    #[test]
    fn seeded_rounds_are_deterministic() {
        let mut a = SequenceMatcher::new(config(6, vec![3])).unwrap();
        let mut b = SequenceMatcher::new(config(6, vec![3])).unwrap();
        a.begin(0);
        b.begin(0);
        assert_eq!(a.current_sequence(), b.current_sequence());
        assert_eq!(a.current_sequence().len(), 3);
        assert!(a.current_sequence().iter().all(|&p| p < 6));
    }

    #[test]
    fn showing_replays_every_step_in_order() {
        let mut matcher = SequenceMatcher::new(config(4, vec![3])).unwrap();
        let begin_events = matcher.begin(0);
        assert_eq!(
            begin_events,
            vec![MatcherEvent::Phase(PatternPhase::Showing)]
        );

        let expected: Vec<usize> = matcher.current_sequence().to_vec();
        let events = run_until_input_open(&mut matcher, 0);

        let highlights: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                MatcherEvent::Highlight(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(highlights, expected);

        // Every highlight is paired with an unhighlight.
        let dims = events
            .iter()
            .filter(|e| matches!(e, MatcherEvent::Unhighlight(_)))
            .count();
        assert_eq!(dims, expected.len());
    }

    #[test]
    fn round_fidelity_exact_replay_succeeds_once() {
        let mut matcher = SequenceMatcher::new(config(4, vec![4])).unwrap();
        matcher.begin(0);
        run_until_input_open(&mut matcher, 0);

        let expected: Vec<usize> = matcher.current_sequence().to_vec();
        let mut successes = 0;
        let mut misses = 0;
        for (i, &pad) in expected.iter().enumerate() {
            for event in matcher.submit(pad, 10_000 + i as u64) {
                match event {
                    MatcherEvent::Phase(PatternPhase::Success) => successes += 1,
                    MatcherEvent::Phase(PatternPhase::Miss) => misses += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(misses, 0);
        assert!(matcher.is_complete());
    }

    #[test]
    fn mismatch_emits_exactly_one_miss_and_closes_input() {
        let mut matcher = SequenceMatcher::new(config(4, vec![3])).unwrap();
        matcher.begin(0);
        run_until_input_open(&mut matcher, 0);

        let wrong = (matcher.current_sequence()[0] + 1) % 4;
        let events = matcher.submit(wrong, 10_000);
        assert_eq!(events, vec![MatcherEvent::Phase(PatternPhase::Miss)]);

        // Input is closed until the retry replays; further presses no-op.
        let events = matcher.submit(wrong, 10_001);
        assert!(events.is_empty());
    }

    #[test]
    fn miss_replays_the_same_round() {
        let mut matcher = SequenceMatcher::new(config(4, vec![3])).unwrap();
        matcher.begin(0);
        run_until_input_open(&mut matcher, 0);

        let original: Vec<usize> = matcher.current_sequence().to_vec();
        let wrong = (original[0] + 1) % 4;
        matcher.submit(wrong, 10_000);

        let events = run_until_input_open(&mut matcher, 10_000);
        assert!(events.contains(&MatcherEvent::Phase(PatternPhase::Showing)));
        assert_eq!(matcher.current_sequence(), original.as_slice());
        assert_eq!(matcher.round_index(), 0);
    }

    #[test]
    fn submit_during_showing_is_a_no_op() {
        let mut matcher = SequenceMatcher::new(config(4, vec![2])).unwrap();
        matcher.begin(0);

        // Still showing at t=0; nothing but due playback comes back.
        let events = matcher.submit(0, 0);
        assert!(!events.contains(&MatcherEvent::Phase(PatternPhase::Miss)));
        assert!(!events.contains(&MatcherEvent::Phase(PatternPhase::Success)));
    }

    #[test]
    fn escalation_scenario_two_three_four_with_one_miss() {
        let mut matcher = SequenceMatcher::new(config(4, vec![2, 3, 4])).unwrap();
        matcher.begin(0);
        let mut now = 0;
        let mut completed = 0;

        // Round 0: play it straight.
        run_until_input_open(&mut matcher, now);
        now += 30_000;
        for &pad in matcher.current_sequence().to_vec().iter() {
            matcher.submit(pad, now);
        }
        assert_eq!(matcher.round_index(), 0);

        // Round 1: third input wrong, then the retry clears it.
        run_until_input_open(&mut matcher, now);
        now += 30_000;
        let round1: Vec<usize> = matcher.current_sequence().to_vec();
        assert_eq!(round1.len(), 3);
        matcher.submit(round1[0], now);
        matcher.submit(round1[1], now);
        let wrong = (round1[2] + 1) % 4;
        let events = matcher.submit(wrong, now);
        assert!(events.contains(&MatcherEvent::Phase(PatternPhase::Miss)));

        let retry = run_until_input_open(&mut matcher, now);
        assert!(retry.contains(&MatcherEvent::Phase(PatternPhase::Showing)));
        assert_eq!(matcher.current_sequence(), round1.as_slice());
        now += 30_000;
        for &pad in round1.iter() {
            matcher.submit(pad, now);
        }

        // Round 2: clear it and expect completion exactly once.
        run_until_input_open(&mut matcher, now);
        now += 30_000;
        assert_eq!(matcher.round_index(), 2);
        assert_eq!(matcher.current_sequence().len(), 4);
        for &pad in matcher.current_sequence().to_vec().iter() {
            for event in matcher.submit(pad, now) {
                if event == MatcherEvent::Completed {
                    completed += 1;
                }
            }
        }
        assert_eq!(completed, 1);
        assert!(matcher.is_complete());

        // Nothing more comes out of a finished matcher.
        assert!(matcher.submit(0, now + 1).is_empty());
        assert!(matcher.tick(now + 100_000).is_empty());
    }

    #[test]
    fn abort_cancels_all_pending_playback() {
        let mut matcher = SequenceMatcher::new(config(4, vec![5])).unwrap();
        matcher.begin(0);
        matcher.abort();
        assert!(matcher.tick(1_000_000).is_empty());
    }
}
