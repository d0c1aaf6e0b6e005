//=========================================================================
// Timer Registry
//=========================================================================
//
// Cancellable, generation-stamped delayed payloads on a logical clock.
//
// Storage is split in two:
// - a min-heap of (deadline, seq) slots fixing dispatch order
// - a payload map holding the live entries
//
// Cancellation removes the entry from the payload map; the heap slot
// stays behind and is skipped when it surfaces. This makes `cancel` and
// `cancel_all` O(live entries) worst case with no heap surgery, and it
// gives the dispatch-time validity check for free: a slot whose payload
// is gone, or whose generation has been retired, is swallowed silently.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use log::{debug, warn};

//=== TimerHandle =========================================================

/// Token identifying one scheduled payload.
///
/// Carries the logical deadline and the generation the entry was
/// scheduled under. Cancellation through a handle is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    id: u64,
    fire_at: u64,
    generation: u64,
}

impl TimerHandle {
    /// Logical time (ms) at which the payload becomes due.
    pub fn fire_at(&self) -> u64 {
        self.fire_at
    }

    /// Generation the entry was scheduled under.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

//=== Internal Types ======================================================

// Dispatch-order key. Equal deadlines break ties by registration order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    fire_at: u64,
    seq: u64,
    id: u64,
}

struct Entry<M> {
    generation: u64,
    payload: M,
}

//=== TimerRegistry =======================================================

/// Cancellable delayed payloads on a logical millisecond clock.
///
/// The registry delivers payloads rather than invoking callbacks: the
/// owner drains due entries with [`advance_to`](Self::advance_to) and
/// interprets them at the tick boundary, so no timer ever mutates engine
/// state re-entrantly from inside dispatch.
///
/// Every entry is tagged with the registry's current generation. Bumping
/// the generation and calling [`cancel_all`](Self::cancel_all) on the old
/// one is the teardown idiom: total, synchronous, and re-checked at
/// dispatch so even an already-due entry cannot slip through.
pub struct TimerRegistry<M> {
    heap: BinaryHeap<Reverse<Slot>>,
    entries: HashMap<u64, Entry<M>>,
    // Generations strictly below this are retired. Generations only move
    // forward, so a single watermark covers every retirement ever made
    // and the registry carries no per-generation bookkeeping.
    retired_below: u64,
    now_ms: u64,
    generation: u64,
    next_id: u64,
    next_seq: u64,
}

impl<M> TimerRegistry<M> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty registry at logical time 0, generation 0.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            entries: HashMap::new(),
            retired_below: 0,
            now_ms: 0,
            generation: 0,
            next_id: 0,
            next_seq: 0,
        }
    }

    //--- Clock & Generation -----------------------------------------------

    /// Current logical time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Generation new entries are tagged with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advances to a fresh generation and returns it.
    ///
    /// Does not cancel anything by itself; pair with
    /// [`cancel_all`](Self::cancel_all) on the superseded generation.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        debug!("Timer registry advanced to generation {}", self.generation);
        self.generation
    }

    //--- Scheduling -------------------------------------------------------

    /// Schedules `payload` to become due after `delay_ms`.
    ///
    /// Negative or non-finite delays are clamped to zero rather than
    /// rejected: zero-delay chaining is a supported pattern and fires on
    /// the next [`advance_to`](Self::advance_to) in registration order.
    pub fn schedule(&mut self, delay_ms: f64, payload: M) -> TimerHandle {
        let delay_ms = if delay_ms.is_finite() && delay_ms >= 0.0 {
            delay_ms
        } else {
            warn!("Clamping malformed timer delay {:?} to 0", delay_ms);
            0.0
        };

        let fire_at = self.now_ms.saturating_add(delay_ms.round() as u64);
        let id = self.next_id;
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.insert(
            id,
            Entry {
                generation: self.generation,
                payload,
            },
        );
        self.heap.push(Reverse(Slot { fire_at, seq, id }));

        TimerHandle {
            id,
            fire_at,
            generation: self.generation,
        }
    }

    //--- Cancellation -----------------------------------------------------

    /// Cancels one entry. Idempotent: a handle that already fired or was
    /// already cancelled is silently ignored.
    pub fn cancel(&mut self, handle: &TimerHandle) {
        self.entries.remove(&handle.id);
    }

    /// Cancels every live entry of `generation` and of every earlier
    /// generation, and retires them all.
    ///
    /// Generations are monotonic, so retiring one retires everything
    /// before it. Retirement is the dispatch-time backstop: a slot of a
    /// retired generation is swallowed even if its entry were somehow
    /// still present when it surfaces from the heap.
    pub fn cancel_all(&mut self, generation: u64) {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.generation > generation);
        self.retired_below = self.retired_below.max(generation.saturating_add(1));

        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(
                "Cancelled {} pending timer(s) of generation {}",
                dropped, generation
            );
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Number of live (scheduled, not yet fired or cancelled) entries.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// True while the handle's entry is still scheduled.
    pub fn is_pending(&self, handle: &TimerHandle) -> bool {
        self.entries.contains_key(&handle.id)
    }

    //--- Dispatch ---------------------------------------------------------

    /// Moves the logical clock to `now_ms` and returns every payload that
    /// became due and is still valid, in (deadline, registration) order.
    ///
    /// The clock is monotonic: a `now_ms` in the past delivers whatever
    /// is already due at the current time and moves nothing backwards.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<M> {
        self.now_ms = self.now_ms.max(now_ms);

        let mut due = Vec::new();
        while let Some(Reverse(slot)) = self.heap.peek() {
            if slot.fire_at > self.now_ms {
                break;
            }
            let Reverse(slot) = self.heap.pop().expect("peeked slot exists");

            // Validity is checked here, at dispatch time: cancelled
            // entries are absent, retired generations are swallowed.
            if let Some(entry) = self.entries.remove(&slot.id) {
                if entry.generation < self.retired_below {
                    debug!(
                        "Swallowing timer {} of retired generation {}",
                        slot.id, entry.generation
                    );
                    continue;
                }
                due.push(entry.payload);
            }
        }
        due
    }
}

impl<M> Default for TimerRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_and_fire_single() {
        let mut reg = TimerRegistry::new();
        reg.schedule(100.0, "tick");

        assert!(reg.advance_to(99).is_empty());
        assert_eq!(reg.advance_to(100), vec!["tick"]);
        assert_eq!(reg.pending(), 0);
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut reg = TimerRegistry::new();
        reg.schedule(300.0, "c");
        reg.schedule(100.0, "a");
        reg.schedule(200.0, "b");

        assert_eq!(reg.advance_to(1000), vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_deadlines_fire_in_registration_order() {
        let mut reg = TimerRegistry::new();
        for label in ["first", "second", "third", "fourth"] {
            reg.schedule(50.0, label);
        }

        assert_eq!(
            reg.advance_to(50),
            vec!["first", "second", "third", "fourth"]
        );
    }

    #[test]
    fn zero_delay_chains_in_registration_order() {
        let mut reg = TimerRegistry::new();
        reg.advance_to(500);
        reg.schedule(0.0, 1);
        reg.schedule(0.0, 2);

        assert_eq!(reg.advance_to(500), vec![1, 2]);
    }

    #[test]
    fn malformed_delays_clamp_to_zero() {
        let mut reg = TimerRegistry::new();
        let h1 = reg.schedule(-25.0, "negative");
        let h2 = reg.schedule(f64::NAN, "nan");
        let h3 = reg.schedule(f64::INFINITY, "inf");

        assert_eq!(h1.fire_at(), 0);
        assert_eq!(h2.fire_at(), 0);
        assert_eq!(h3.fire_at(), 0);
        assert_eq!(reg.advance_to(0), vec!["negative", "nan", "inf"]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut reg = TimerRegistry::new();
        let handle = reg.schedule(10.0, "x");

        assert!(reg.is_pending(&handle));
        reg.cancel(&handle);
        reg.cancel(&handle);
        assert!(!reg.is_pending(&handle));
        assert!(reg.advance_to(100).is_empty());
    }

    #[test]
    fn cancel_all_is_total_for_large_batches() {
        let mut reg = TimerRegistry::new();
        let gen = reg.generation();
        for i in 0..1000 {
            reg.schedule(i as f64, i);
        }
        assert_eq!(reg.pending(), 1000);

        reg.cancel_all(gen);

        assert_eq!(reg.pending(), 0);
        // No payload from the batch surfaces no matter how far the
        // clock advances.
        assert!(reg.advance_to(u64::MAX).is_empty());
    }

    #[test]
    fn cancel_all_spares_newer_generations() {
        let mut reg = TimerRegistry::new();
        let old_gen = reg.generation();
        reg.schedule(10.0, "stale");

        reg.bump_generation();
        reg.schedule(10.0, "live");

        reg.cancel_all(old_gen);
        assert_eq!(reg.advance_to(10), vec!["live"]);
    }

    #[test]
    fn cancel_all_sweeps_earlier_generations_too() {
        let mut reg = TimerRegistry::new();
        reg.schedule(10.0, "oldest");
        let middle = reg.bump_generation();
        reg.schedule(10.0, "stale");

        reg.bump_generation();
        reg.schedule(10.0, "live");

        reg.cancel_all(middle);
        assert_eq!(reg.advance_to(10), vec!["live"]);
    }

    #[test]
    fn retirement_memory_stays_constant_across_cycles() {
        let mut reg = TimerRegistry::new();
        for i in 0..1000u64 {
            reg.schedule(5.0, i);
            let gen = reg.generation();
            reg.cancel_all(gen);
            reg.bump_generation();
        }

        // One watermark covers all thousand retirements.
        assert_eq!(reg.retired_below, 1000);
        assert_eq!(reg.pending(), 0);

        // The live generation still schedules and fires normally.
        reg.schedule(0.0, 7777);
        assert_eq!(reg.advance_to(0), vec![7777]);
    }

    #[test]
    fn retired_generation_swallows_already_due_entries() {
        let mut reg = TimerRegistry::new();
        let gen = reg.generation();
        reg.schedule(0.0, "queued");

        // Entry is due at time 0 and sitting in the heap, but the
        // generation is retired before dispatch.
        reg.cancel_all(gen);
        assert!(reg.advance_to(0).is_empty());
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut reg = TimerRegistry::new();
        reg.advance_to(1000);
        let handle = reg.schedule(50.0, "late");

        assert_eq!(handle.fire_at(), 1050);
        assert!(reg.advance_to(10).is_empty());
        assert_eq!(reg.now(), 1000);
        assert_eq!(reg.advance_to(1050), vec!["late"]);
    }

    #[test]
    fn handles_report_generation() {
        let mut reg = TimerRegistry::<u8>::new();
        let h0 = reg.schedule(1.0, 0);
        reg.bump_generation();
        let h1 = reg.schedule(1.0, 1);

        assert_eq!(h0.generation(), 0);
        assert_eq!(h1.generation(), 1);
    }
}
