//! Reusable barrier for N-way rendezvous between OS threads.
//!
//! The barrier trips when `parties` callers have arrived. Exactly one caller
//! observes `is_leader = true` per generation. Waiters block on a condition
//! variable and are released by a generation bump, so a thread arriving for
//! the next round can never be mistaken for one still leaving the previous
//! round.
//!
//! Crossing the barrier is a full synchronization point: every write made by
//! any party before `wait` happens-before every read made by any party after
//! `wait` returns. The harness relies on this to hand result cells from the
//! workers to the verifier without locking them.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// Barrier for N-way rendezvous.
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl Barrier {
    /// Creates a new barrier that trips when `parties` have arrived.
    ///
    /// # Panics
    /// Panics if `parties == 0`.
    #[must_use]
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier requires at least 1 party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Returns the number of parties required to trip the barrier.
    #[must_use]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Returns how many times the barrier has tripped.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Blocks until all parties have arrived.
    pub fn wait(&self) -> BarrierWaitResult {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            // Trip the barrier and advance the generation.
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            drop(state);
            self.released.notify_all();
            return BarrierWaitResult { is_leader: true };
        }

        while state.generation == generation {
            self.released.wait(&mut state);
        }
        BarrierWaitResult { is_leader: false }
    }
}

/// Result of a barrier wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    is_leader: bool,
}

impl BarrierWaitResult {
    /// Returns true for exactly one party (the leader) each generation.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }
}
