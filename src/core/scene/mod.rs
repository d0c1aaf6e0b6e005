//=========================================================================
// Scene System
//=========================================================================
//
// Scene descriptors for the sequencer.
//
// A scene is data, not behavior: a key, a tagged kind declaring which
// detector (if any) the scene needs, an optional auto-advance deadline,
// and opaque enter/exit side-effect hooks. The sequencer instantiates
// the declared detector fresh on every entry, so per-entry state (a new
// pattern round, an un-erased surface) comes for free.
//
// The tagged `SceneKind` is matched exhaustively by the sequencer:
// adding a detector kind is a compile-time-checked change, not an
// object-shape guess.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt::Debug;
use std::hash::Hash;

//=== Internal Dependencies ===============================================

use crate::core::detector::{CoverageConfig, GestureConfig, SequenceConfig};
use crate::core::error::{ConfigError, ConfigResult};

//=== Scene Key Trait =====================================================

/// Marker trait for scene identifiers.
///
/// Scene keys uniquely identify scenes in a sequence. Typically
/// implemented by an experience-specific enum.
pub trait SceneKey: Clone + Copy + Eq + Hash + Debug + Send + 'static {}

//=== Scene Hooks =========================================================

/// Opaque side-effect hook invoked at a scene boundary.
///
/// The engine calls hooks with no arguments and expects no return
/// value; what they do (start a typewriter animation, trigger the
/// celebration effect) is entirely the caller's business.
pub type SceneHook = Box<dyn FnMut() + Send>;

//=== SceneKind ===========================================================

/// Which completion mechanism a scene uses.
///
/// Each kind carries only the configuration it needs.
pub enum SceneKind {
    /// No detector; completes through its auto-advance deadline only.
    Timed,

    /// "Watch, then repeat" pattern rounds.
    InputSequence(SequenceConfig),

    /// Drag-past-threshold reveal.
    Gesture(GestureConfig),

    /// Erase-to-reveal coverage surface.
    Coverage(CoverageConfig),
}

impl SceneKind {
    fn name(&self) -> &'static str {
        match self {
            SceneKind::Timed => "timed",
            SceneKind::InputSequence(_) => "input-sequence",
            SceneKind::Gesture(_) => "gesture",
            SceneKind::Coverage(_) => "coverage",
        }
    }
}

impl Debug for SceneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

//=== Scene ===============================================================

/// One unit of the timed experience.
///
/// Built through the kind-specific constructors, then refined with the
/// fluent `with_*`/`on_*` methods:
///
/// ```
/// # use unveil_engine::prelude::*;
/// # #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// # enum Part { Splash }
/// # impl SceneKey for Part {}
/// let scene = Scene::timed(Part::Splash, 2500.0)
///     .on_enter(|| println!("typewriter starts"));
/// ```
pub struct Scene<K: SceneKey> {
    pub(crate) key: K,
    pub(crate) kind: SceneKind,
    pub(crate) auto_advance_ms: Option<f64>,
    pub(crate) enter_hook: Option<SceneHook>,
    pub(crate) exit_hook: Option<SceneHook>,
}

impl<K: SceneKey> Scene<K> {
    //--- Construction -----------------------------------------------------

    /// A pure-timer scene that advances after `auto_advance_ms`.
    pub fn timed(key: K, auto_advance_ms: f64) -> Self {
        Self {
            key,
            kind: SceneKind::Timed,
            auto_advance_ms: Some(auto_advance_ms),
            enter_hook: None,
            exit_hook: None,
        }
    }

    /// A pattern-game scene.
    pub fn input_sequence(key: K, config: SequenceConfig) -> Self {
        Self {
            key,
            kind: SceneKind::InputSequence(config),
            auto_advance_ms: None,
            enter_hook: None,
            exit_hook: None,
        }
    }

    /// A drag-to-open scene.
    pub fn gesture(key: K, config: GestureConfig) -> Self {
        Self {
            key,
            kind: SceneKind::Gesture(config),
            auto_advance_ms: None,
            enter_hook: None,
            exit_hook: None,
        }
    }

    /// An erase-to-reveal scene.
    pub fn coverage(key: K, config: CoverageConfig) -> Self {
        Self {
            key,
            kind: SceneKind::Coverage(config),
            auto_advance_ms: None,
            enter_hook: None,
            exit_hook: None,
        }
    }

    //--- Fluent Configuration ---------------------------------------------

    /// Adds a fallback deadline that advances the scene even without
    /// detector completion.
    pub fn with_auto_advance(mut self, ms: f64) -> Self {
        self.auto_advance_ms = Some(ms);
        self
    }

    /// Sets the side-effect hook run when the scene becomes current.
    pub fn on_enter(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.enter_hook = Some(Box::new(hook));
        self
    }

    /// Sets the side-effect hook run when the scene is exited.
    pub fn on_exit(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.exit_hook = Some(Box::new(hook));
        self
    }

    //--- Queries ----------------------------------------------------------

    /// This scene's stable identifier.
    pub fn key(&self) -> K {
        self.key
    }

    //--- Validation -------------------------------------------------------

    /// Rejects invalid scene configuration.
    ///
    /// A `Timed` scene with no deadline could never complete, so it is
    /// a configuration error, not a runtime hang. Malformed deadline
    /// values themselves are not rejected here; the timer registry
    /// clamps them to zero by contract.
    pub(crate) fn validate(&self) -> ConfigResult<()> {
        if matches!(self.kind, SceneKind::Timed) && self.auto_advance_ms.is_none() {
            return Err(ConfigError::MissingAutoAdvance(format!("{:?}", self.key)));
        }
        match &self.kind {
            SceneKind::Timed => Ok(()),
            SceneKind::InputSequence(config) => config.validate(),
            SceneKind::Gesture(config) => config.validate(),
            SceneKind::Coverage(config) => config.validate(),
        }
    }

    //--- Hook Invocation --------------------------------------------------

    pub(crate) fn run_enter_hook(&mut self) {
        if let Some(hook) = self.enter_hook.as_mut() {
            hook();
        }
    }

    pub(crate) fn run_exit_hook(&mut self) {
        if let Some(hook) = self.exit_hook.as_mut() {
            hook();
        }
    }
}

impl<K: SceneKey> Debug for Scene<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("auto_advance_ms", &self.auto_advance_ms)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Part {
        Splash,
        Game,
    }

    impl SceneKey for Part {}

    #[test]
    fn timed_scene_carries_its_deadline() {
        let scene = Scene::timed(Part::Splash, 1800.0);
        assert_eq!(scene.key(), Part::Splash);
        assert_eq!(scene.auto_advance_ms, Some(1800.0));
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn timed_kind_without_deadline_is_rejected() {
        // Constructed manually: the public constructor cannot produce this.
        let scene = Scene {
            key: Part::Splash,
            kind: SceneKind::Timed,
            auto_advance_ms: None,
            enter_hook: None,
            exit_hook: None,
        };
        assert!(matches!(
            scene.validate(),
            Err(ConfigError::MissingAutoAdvance(_))
        ));
    }

    #[test]
    fn detector_scene_validation_delegates_to_config() {
        let scene = Scene::input_sequence(Part::Game, SequenceConfig::new(0, vec![2]));
        assert_eq!(scene.validate(), Err(ConfigError::NoPads));

        let scene = Scene::input_sequence(Part::Game, SequenceConfig::new(4, vec![2, 3]));
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn hooks_run_when_invoked() {
        let entered = Arc::new(AtomicUsize::new(0));
        let exited = Arc::new(AtomicUsize::new(0));
        let (e, x) = (entered.clone(), exited.clone());

        let mut scene = Scene::timed(Part::Splash, 100.0)
            .on_enter(move || {
                e.fetch_add(1, Ordering::SeqCst);
            })
            .on_exit(move || {
                x.fetch_add(1, Ordering::SeqCst);
            });

        scene.run_enter_hook();
        scene.run_exit_hook();
        scene.run_exit_hook();
        assert_eq!(entered.load(Ordering::SeqCst), 1);
        assert_eq!(exited.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn hookless_scene_invocation_is_a_no_op() {
        let mut scene = Scene::gesture(Part::Game, GestureConfig::new(320.0));
        scene.run_enter_hook();
        scene.run_exit_hook();
    }
}
