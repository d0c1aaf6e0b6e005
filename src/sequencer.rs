//=========================================================================
// Scene Sequencer
//=========================================================================
//
// Main entry point and orchestrator of the timed experience.
//
// Architecture:
// ```text
//     SequencerBuilder  ──build()──>  SceneSequencer
//         │                              │
//         ├─ scene()                     ├─ tick(now) / direct input
//         └─ on_finished()               ├─ TimerRegistry (auto-advance)
//                                        ├─ ActiveDetector (per scene)
//                                        └─ CompletionBus (key-filtered)
// ```
//
// Exactly one scene is current while running. Entering a scene
// instantiates its detector fresh and arms its auto-advance timer under
// a fresh generation; whichever signal resolves first wins and the
// loser is cancelled in the same transition. Exit is total: timers of
// the scene's generation are cancelled, the detector is detached and
// aborted, and only then does `on_exit` run, before the next scene's
// `on_enter`.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::completion::CompletionBus;
use crate::core::detector::{
    CoverageEvent, CoverageScanner, GestureEvent, GestureThresholdDetector, MatcherEvent,
    SequenceMatcher, StrokeSegment,
};
use crate::core::event::SequencerEvent;
use crate::core::input::{InputCollector, InputEvent, InputFeed};
use crate::core::scene::{Scene, SceneHook, SceneKey, SceneKind};
use crate::core::timer::TimerRegistry;
use crate::core::error::{ConfigError, ConfigResult};

//=== SequencerBuilder ====================================================

/// Builder for configuring and constructing a [`SceneSequencer`].
///
/// Scenes play in the order they are added. The whole configuration is
/// validated in [`build`](Self::build); nothing is silently "fixed".
///
/// # Examples
///
/// ```
/// use unveil_engine::prelude::*;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum Part { Splash, Reveal }
/// impl SceneKey for Part {}
///
/// let sequencer = SequencerBuilder::new()
///     .scene(Scene::timed(Part::Splash, 2200.0))
///     .scene(Scene::gesture(Part::Reveal, GestureConfig::new(320.0)))
///     .on_finished(|| { /* trigger the celebration effect */ })
///     .build()
///     .expect("valid configuration");
/// # let _ = sequencer;
/// ```
pub struct SequencerBuilder<K: SceneKey> {
    scenes: Vec<Scene<K>>,
    channel_capacity: usize,
    finale_hook: Option<SceneHook>,
}

impl<K: SceneKey> SequencerBuilder<K> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            scenes: Vec::new(),
            channel_capacity: 64,
            finale_hook: None,
        }
    }

    /// Appends a scene to the sequence.
    pub fn scene(mut self, scene: Scene<K>) -> Self {
        self.scenes.push(scene);
        self
    }

    /// Sets the input feed capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Sets the terminal side-effect hook, invoked exactly once when
    /// the final scene completes (e.g. trigger the celebration effect).
    pub fn on_finished(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.finale_hook = Some(Box::new(hook));
        self
    }

    /// Validates the configuration and builds the sequencer.
    pub fn build(self) -> ConfigResult<SceneSequencer<K>> {
        if self.scenes.is_empty() {
            return Err(ConfigError::EmptySceneList);
        }
        for scene in &self.scenes {
            scene.validate()?;
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if self.scenes[..i].iter().any(|s| s.key == scene.key) {
                warn!("Scene key {:?} appears more than once", scene.key);
            }
        }

        info!(
            "Building sequencer with {} scene(s) (channel: {})",
            self.scenes.len(),
            self.channel_capacity
        );

        let (feed, collector) = InputCollector::channel(self.channel_capacity);
        Ok(SceneSequencer {
            scenes: self.scenes,
            state: SequencerState::Idle,
            detector: ActiveDetector::None,
            timers: TimerRegistry::new(),
            bus: CompletionBus::new(),
            feed,
            collector,
            scratch: Vec::new(),
            transitioning: false,
            finale_hook: self.finale_hook,
        })
    }
}

impl<K: SceneKey> Default for SequencerBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Internal Types ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequencerState {
    Idle,
    Running(usize),
    Done,
}

// The detector the current scene declared, instantiated at entry and
// dropped at exit. `None` covers pure-timer scenes.
#[derive(Debug)]
enum ActiveDetector {
    None,
    Sequence(SequenceMatcher),
    Gesture(GestureThresholdDetector),
    Coverage(CoverageScanner),
}

// Delayed effects owned by the sequencer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvanceTimer {
    AutoAdvance { scene_index: usize },
}

// Detector output captured inside a borrow of the detector, mapped to
// sequencer events once the borrow has ended.
enum DetectorOut {
    Nothing,
    Matcher(Vec<MatcherEvent>),
    Gesture(Vec<GestureEvent>),
    Coverage(Vec<CoverageEvent>),
}

//=== SceneSequencer ======================================================

/// Orchestrates an ordered list of scenes.
///
/// Drive it with a logical clock: call [`tick`](Self::tick) whenever
/// time passes, and deliver input either through the direct methods
/// ([`submit`](Self::submit), [`pointer_down`](Self::pointer_down), …)
/// or from another thread through the [`InputFeed`] handle. Every call
/// returns the [`SequencerEvent`]s the display layer should react to.
///
/// Teardown discipline: every delayed effect is generation-stamped and
/// every completion is key-filtered, so a signal that outlives its
/// scene resolves to "nothing happens", never a double transition.
pub struct SceneSequencer<K: SceneKey> {
    scenes: Vec<Scene<K>>,
    state: SequencerState,
    detector: ActiveDetector,
    timers: TimerRegistry<AdvanceTimer>,
    bus: CompletionBus<K>,
    feed: InputFeed,
    collector: InputCollector,
    scratch: Vec<InputEvent>,
    transitioning: bool,
    finale_hook: Option<SceneHook>,
}

impl<K: SceneKey> SceneSequencer<K> {
    //--- Lifecycle --------------------------------------------------------

    /// Enters the first scene at logical time `now_ms`.
    ///
    /// Starting a sequencer that is not idle is ignored with a warning.
    pub fn start(&mut self, now_ms: u64) -> Vec<SequencerEvent<K>> {
        if self.state != SequencerState::Idle {
            warn!("start() called on a sequencer that is not idle");
            return Vec::new();
        }
        info!("Sequence starting with {} scene(s)", self.scenes.len());
        let mut out = Vec::new();
        self.timers.advance_to(now_ms);
        self.enter_scene(0, now_ms, &mut out);
        out
    }

    /// Synchronous, total teardown back to idle.
    ///
    /// Cancels every outstanding timer, aborts and detaches the active
    /// detector, runs the current scene's `on_exit`, and discards
    /// pending completions and input. After `stop` returns, no
    /// previously scheduled signal can mutate engine state.
    pub fn stop(&mut self) {
        let SequencerState::Running(index) = self.state else {
            self.state = SequencerState::Idle;
            return;
        };
        info!("Sequence stopped while in scene {:?}", self.scenes[index].key);

        let gen = self.timers.generation();
        self.timers.cancel_all(gen);
        self.timers.bump_generation();
        self.detach_detector();
        self.scenes[index].run_exit_hook();
        self.bus.clear();

        // Drain whatever input was queued; it belongs to a dead scene.
        let mut backlog = std::mem::take(&mut self.scratch);
        backlog.clear();
        self.collector.collect(&mut backlog);
        backlog.clear();
        self.scratch = backlog;

        self.state = SequencerState::Idle;
    }

    //--- Driving ----------------------------------------------------------

    /// Advances the logical clock and processes everything that became
    /// due: queued input, auto-advance timers, detector playback and
    /// completion claims.
    pub fn tick(&mut self, now_ms: u64) -> Vec<SequencerEvent<K>> {
        let mut out = Vec::new();
        self.drain_feed(now_ms, &mut out);
        self.advance_timers(now_ms, &mut out);
        self.tick_detector(now_ms, &mut out);
        self.resolve_completions(now_ms, &mut out);
        out
    }

    /// Records a completion claim for `key` from an external detector.
    ///
    /// Stale claims (any key other than the current scene's) are
    /// dropped silently at the next resolution point.
    pub fn notify_complete(&mut self, key: K, now_ms: u64) -> Vec<SequencerEvent<K>> {
        let mut out = Vec::new();
        self.advance_timers(now_ms, &mut out);
        self.bus.notify_complete(key);
        self.resolve_completions(now_ms, &mut out);
        out
    }

    //--- Direct Input -----------------------------------------------------

    /// Submits a pad press for the pattern game.
    pub fn submit(&mut self, pad: usize, now_ms: u64) -> Vec<SequencerEvent<K>> {
        self.input(InputEvent::PadPress { pad }, now_ms)
    }

    /// Pointer/touch down.
    pub fn pointer_down(&mut self, x: f32, y: f32, now_ms: u64) -> Vec<SequencerEvent<K>> {
        self.input(InputEvent::PointerDown { x, y }, now_ms)
    }

    /// Pointer/touch move.
    pub fn pointer_move(&mut self, x: f32, y: f32, now_ms: u64) -> Vec<SequencerEvent<K>> {
        self.input(InputEvent::PointerMove { x, y }, now_ms)
    }

    /// Pointer/touch release.
    pub fn pointer_up(&mut self, now_ms: u64) -> Vec<SequencerEvent<K>> {
        self.input(InputEvent::PointerUp, now_ms)
    }

    /// Pointer/touch cancelled by the platform.
    pub fn pointer_cancel(&mut self, now_ms: u64) -> Vec<SequencerEvent<K>> {
        self.input(InputEvent::PointerCancel, now_ms)
    }

    /// One erase stroke over the coverage surface.
    pub fn stroke(
        &mut self,
        segment: StrokeSegment,
        brush_radius: f32,
        now_ms: u64,
    ) -> Vec<SequencerEvent<K>> {
        self.input(
            InputEvent::Stroke {
                segment,
                brush_radius,
            },
            now_ms,
        )
    }

    fn input(&mut self, event: InputEvent, now_ms: u64) -> Vec<SequencerEvent<K>> {
        let mut out = Vec::new();
        self.advance_timers(now_ms, &mut out);
        self.apply_input(event, now_ms, &mut out);
        self.resolve_completions(now_ms, &mut out);
        out
    }

    //--- Queries ----------------------------------------------------------

    /// A cloneable handle for delivering input from the UI layer.
    pub fn input_feed(&self) -> InputFeed {
        self.feed.clone()
    }

    /// Key of the current scene, if running.
    pub fn current_scene(&self) -> Option<K> {
        match self.state {
            SequencerState::Running(index) => Some(self.scenes[index].key),
            _ => None,
        }
    }

    /// True once the final scene has completed.
    pub fn is_done(&self) -> bool {
        self.state == SequencerState::Done
    }

    //--- Step 1: Queued Input ---------------------------------------------

    fn drain_feed(&mut self, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        let mut batch = std::mem::take(&mut self.scratch);
        batch.clear();
        self.collector.collect(&mut batch);
        for event in batch.drain(..) {
            self.apply_input(event, now_ms, out);
        }
        self.scratch = batch;
    }

    fn apply_input(&mut self, event: InputEvent, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        let Some(key) = self.current_scene() else {
            debug!("Dropping input {:?} while not running", event);
            return;
        };

        let result = match (&mut self.detector, event) {
            (ActiveDetector::Sequence(matcher), InputEvent::PadPress { pad }) => {
                DetectorOut::Matcher(matcher.submit(pad, now_ms))
            }
            (ActiveDetector::Gesture(gesture), InputEvent::PointerDown { x, y }) => {
                DetectorOut::Gesture(gesture.drag_start(x, y))
            }
            (ActiveDetector::Gesture(gesture), InputEvent::PointerMove { x, y }) => {
                DetectorOut::Gesture(gesture.drag_move(x, y))
            }
            (ActiveDetector::Gesture(gesture), InputEvent::PointerUp) => {
                DetectorOut::Gesture(gesture.drag_end())
            }
            (ActiveDetector::Gesture(gesture), InputEvent::PointerCancel) => {
                DetectorOut::Gesture(gesture.drag_cancel())
            }
            (
                ActiveDetector::Coverage(scanner),
                InputEvent::Stroke {
                    segment,
                    brush_radius,
                },
            ) => DetectorOut::Coverage(scanner.record_stroke(segment, brush_radius)),
            (_, event) => {
                // Input the current scene has no detector for. User
                // input timing cannot be controlled by the UI layer, so
                // this is an idempotent no-op rather than an error.
                debug!("Ignoring {:?} for scene {:?}", event, key);
                DetectorOut::Nothing
            }
        };

        self.map_detector_out(key, result, out);
    }

    //--- Step 2: Timers ---------------------------------------------------

    fn advance_timers(&mut self, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        for timer in self.timers.advance_to(now_ms) {
            match timer {
                AdvanceTimer::AutoAdvance { scene_index } => {
                    // Re-validate at apply time: the scene may have been
                    // exited earlier in this same batch.
                    if self.state == SequencerState::Running(scene_index) {
                        debug!(
                            "Auto-advance fired for scene {:?}",
                            self.scenes[scene_index].key
                        );
                        self.advance(now_ms, out);
                    }
                }
            }
        }
    }

    //--- Step 3: Detector Playback ----------------------------------------

    fn tick_detector(&mut self, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        let Some(key) = self.current_scene() else {
            return;
        };
        // Only the matcher has time-driven behavior.
        let events = match &mut self.detector {
            ActiveDetector::Sequence(matcher) => matcher.tick(now_ms),
            _ => return,
        };
        self.map_detector_out(key, DetectorOut::Matcher(events), out);
    }

    //--- Step 4: Completion Resolution ------------------------------------

    fn resolve_completions(&mut self, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        match self.state {
            SequencerState::Running(index) => {
                let key = self.scenes[index].key;
                if self.bus.drain_matching(key) {
                    self.advance(now_ms, out);
                }
            }
            _ => {
                if !self.bus.is_empty() {
                    debug!(
                        "Discarding {} completion claim(s) while not running",
                        self.bus.len()
                    );
                    self.bus.clear();
                }
            }
        }
    }

    //--- Event Mapping ----------------------------------------------------

    fn map_detector_out(&mut self, key: K, result: DetectorOut, out: &mut Vec<SequencerEvent<K>>) {
        match result {
            DetectorOut::Nothing => {}
            DetectorOut::Matcher(events) => {
                for event in events {
                    match event {
                        MatcherEvent::Phase(phase) => {
                            out.push(SequencerEvent::ScenePhaseChanged { scene: key, phase })
                        }
                        MatcherEvent::Highlight(pad) => out.push(SequencerEvent::PadHighlight {
                            scene: key,
                            pad,
                            lit: true,
                        }),
                        MatcherEvent::Unhighlight(pad) => out.push(SequencerEvent::PadHighlight {
                            scene: key,
                            pad,
                            lit: false,
                        }),
                        MatcherEvent::Completed => self.bus.notify_complete(key),
                    }
                }
            }
            DetectorOut::Gesture(events) => {
                for event in events {
                    match event {
                        GestureEvent::Progress(value) => {
                            out.push(SequencerEvent::GestureProgress(value))
                        }
                        GestureEvent::Committed => {
                            out.push(SequencerEvent::GestureCommitted(true));
                            self.bus.notify_complete(key);
                        }
                        GestureEvent::SnappedBack => {
                            out.push(SequencerEvent::GestureCommitted(false))
                        }
                    }
                }
            }
            DetectorOut::Coverage(events) => {
                for event in events {
                    match event {
                        CoverageEvent::Revealed(fraction) => {
                            out.push(SequencerEvent::RevealedFraction(fraction))
                        }
                        CoverageEvent::Completed => {
                            out.push(SequencerEvent::CoverageCompleted);
                            self.bus.notify_complete(key);
                        }
                    }
                }
            }
        }
    }

    //--- Transitions ------------------------------------------------------

    fn advance(&mut self, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        if self.transitioning {
            debug!("advance() re-entered during a transition, ignoring");
            return;
        }
        let SequencerState::Running(index) = self.state else {
            return;
        };
        self.transitioning = true;

        self.exit_scene(index, out);

        let next = index + 1;
        if next < self.scenes.len() {
            self.enter_scene(next, now_ms, out);
        } else {
            info!("Sequence done");
            self.state = SequencerState::Done;
            if let Some(hook) = self.finale_hook.as_mut() {
                // Terminal side effect, invoked exactly once: Done is
                // terminal and advance() is unreachable from it.
                hook();
            }
            out.push(SequencerEvent::SequenceDone);
        }

        self.transitioning = false;
    }

    fn exit_scene(&mut self, index: usize, out: &mut Vec<SequencerEvent<K>>) {
        let key = self.scenes[index].key;
        debug!("Exiting scene {:?}", key);

        // Order matters: timers die, the detector is detached, and only
        // then does on_exit run; nothing of this scene can fire during
        // or after the hook.
        let gen = self.timers.generation();
        self.timers.cancel_all(gen);
        self.timers.bump_generation();
        self.detach_detector();
        self.bus.clear();
        self.scenes[index].run_exit_hook();
        out.push(SequencerEvent::SceneCompleted(key));
    }

    fn enter_scene(&mut self, index: usize, now_ms: u64, out: &mut Vec<SequencerEvent<K>>) {
        let key = self.scenes[index].key;
        debug!("Entering scene {:?}", key);
        self.state = SequencerState::Running(index);

        // Fresh detector per entry; a re-entered scene starts over.
        let begin = match &self.scenes[index].kind {
            SceneKind::Timed => DetectorOut::Nothing,
            SceneKind::InputSequence(config) => {
                let mut matcher = SequenceMatcher::new(config.clone())
                    .expect("sequence config validated at build time");
                let events = matcher.begin(now_ms);
                self.detector = ActiveDetector::Sequence(matcher);
                DetectorOut::Matcher(events)
            }
            SceneKind::Gesture(config) => {
                let gesture = GestureThresholdDetector::new(*config)
                    .expect("gesture config validated at build time");
                self.detector = ActiveDetector::Gesture(gesture);
                DetectorOut::Nothing
            }
            SceneKind::Coverage(config) => {
                let scanner = CoverageScanner::new(*config)
                    .expect("coverage config validated at build time");
                self.detector = ActiveDetector::Coverage(scanner);
                DetectorOut::Nothing
            }
        };

        if let Some(ms) = self.scenes[index].auto_advance_ms {
            self.timers
                .schedule(ms, AdvanceTimer::AutoAdvance { scene_index: index });
        }

        self.scenes[index].run_enter_hook();
        self.map_detector_out(key, begin, out);
    }

    fn detach_detector(&mut self) {
        let detached = std::mem::replace(&mut self.detector, ActiveDetector::None);
        if let ActiveDetector::Sequence(mut matcher) = detached {
            // The matcher owns pending playback timers; kill them too.
            matcher.abort();
        }
    }
}

// Hooks and channel handles are omitted; the rest summarizes the runtime
// state.
impl<K: SceneKey> std::fmt::Debug for SceneSequencer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSequencer")
            .field("state", &self.state)
            .field("detector", &self.detector)
            .field("scenes", &self.scenes)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================
