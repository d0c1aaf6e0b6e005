//=========================================================================
// Unveil Engine — Library Root
//
// This crate defines the public API surface of the Unveil Engine: a
// timed interactive scene engine for animated reveal experiences.
//
// Responsibilities:
// - Expose the sequencer facade (`SceneSequencer`, `SequencerBuilder`)
// - Expose the core subsystems (timers, scenes, detectors, events) for
//   hosts that drive a detector standalone
// - Guarantee leak-free cancellation: no timer, playback step or
//   detector callback survives the scene that created it
//
// Typical usage:
// ```no_run
// use unveil_engine::prelude::*;
//
// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
// enum Part { Splash, Reveal }
// impl SceneKey for Part {}
//
// let mut sequencer = SequencerBuilder::new()
//     .scene(Scene::timed(Part::Splash, 2200.0))
//     .scene(Scene::gesture(Part::Reveal, GestureConfig::new(320.0)))
//     .on_finished(|| { /* celebration */ })
//     .build()
//     .expect("valid configuration");
//
// sequencer.start(0);
// // per animation frame:
// let events = sequencer.tick(16);
// # let _ = events;
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains all engine subsystems (timers, scenes, detectors,
// completion routing, input ingress). It is exposed publicly so hosts
// can drive an individual detector without the sequencer, but normal
// application code will mostly use the top-level facade.
//
pub mod core;

//--- Internal Modules ----------------------------------------------------
//
// `sequencer` defines the orchestration facade and its builder.
//
mod sequencer;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the facade as the main entry point, so users can simply
// `use unveil_engine::{SceneSequencer, SequencerBuilder};` without
// knowing the internal module structure.
//
pub use sequencer::{SceneSequencer, SequencerBuilder};

pub mod prelude;
