//=========================================================================
// Timer System
//=========================================================================
//
// Generation-stamped delayed payload delivery.
//
// Architecture:
//   schedule() → BinaryHeap (deadline, FIFO seq)
//                     ↓
//   advance_to(now) → validity check → delivered payloads
//
// The registry is the only timing primitive in the engine. Every delayed
// effect is scheduled here, tagged with the owner's current generation,
// and re-validated at dispatch time. `cancel_all(generation)` is total:
// after it returns, no payload from that generation is ever delivered.
//
//=========================================================================

//=== Module Declarations =================================================

mod registry;

//=== Public API ==========================================================

pub use registry::{TimerHandle, TimerRegistry};
