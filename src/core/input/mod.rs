//=========================================================================
// Input Ingress
//=========================================================================
//
// Event types and the channel that carries them into the sequencer.
//
// Architecture:
//   UI layer → InputFeed (bounded channel) → sequencer drain per tick
//
// The rendering/gesture layer is out of scope; it delivers pointer,
// pad and stroke events through a cloneable `InputFeed` handle. The
// sequencer drains the channel with bounded polling each tick to
// prevent a chatty producer from starving the update loop.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::warn;

//=== Internal Dependencies ===============================================

use crate::core::detector::StrokeSegment;

//=== InputEvent ==========================================================

/// Raw input events consumed by the engine.
///
/// Coordinates are in the same units the scene's detector was
/// configured with. Events are Copy-cheap; no heap allocations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer/touch went down at `(x, y)`.
    PointerDown { x: f32, y: f32 },

    /// Pointer/touch moved to `(x, y)`.
    PointerMove { x: f32, y: f32 },

    /// Pointer/touch was released.
    PointerUp,

    /// Pointer/touch was cancelled by the platform.
    PointerCancel,

    /// A discrete pad press for the pattern game.
    PadPress { pad: usize },

    /// One erase stroke over a coverage surface.
    Stroke {
        segment: StrokeSegment,
        brush_radius: f32,
    },
}

//=== InputFeed ===========================================================

/// Cloneable producer handle for delivering input into the sequencer.
///
/// Overflow drops the event with a warning rather than blocking the UI
/// thread; the consumer may be mid-transition and a dropped input is
/// the same "nothing happens" the user would see from a stale signal.
#[derive(Clone)]
pub struct InputFeed {
    sender: Sender<InputEvent>,
}

impl InputFeed {
    /// Sends one event, dropping it if the channel is full or closed.
    pub fn send(&self, event: InputEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Input feed full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Input feed disconnected, sequencer is gone");
            }
        }
    }
}

//=== InputCollector ======================================================

/// Consumer side: drains pending input with bounded polling.
pub(crate) struct InputCollector {
    receiver: Receiver<InputEvent>,
}

impl InputCollector {
    /// Creates a connected feed/collector pair with the given capacity.
    pub(crate) fn channel(capacity: usize) -> (InputFeed, Self) {
        let (sender, receiver) = bounded(capacity);
        (InputFeed { sender }, Self { receiver })
    }

    /// Drains pending events into `out`, bounded to prevent starvation.
    pub(crate) fn collect(&mut self, out: &mut Vec<InputEvent>) {
        const MAX_EVENTS_PER_TICK: usize = 256;

        let mut drained = 0;
        while drained < MAX_EVENTS_PER_TICK {
            match self.receiver.try_recv() {
                Ok(event) => {
                    out.push(event);
                    drained += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if drained >= MAX_EVENTS_PER_TICK {
            warn!("Input backlog: drained {} events this tick", drained);
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
