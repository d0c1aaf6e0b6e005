//=========================================================================
// Core Subsystems
//=========================================================================
//
// All engine subsystems below the sequencer facade.
//
// Everything here is single-threaded and cooperative: pointer events,
// timer expirations and stroke events interleave as callbacks, never in
// parallel. Between any two callbacks the world may have moved on, so
// every delayed or cross-boundary effect re-validates itself (timer
// generation, scene key) before touching engine state. That discipline,
// not locking, is the correctness story of this crate.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod completion;
pub mod detector;
pub mod error;
pub mod event;
pub mod input;
pub mod scene;
pub mod timer;
