//! Thread synchronization primitives.
//!
//! # Primitives
//!
//! - [`Barrier`]: reusable N-party rendezvous with leader election
//!
//! The harness uses a pair of barriers with `task_count + 1` parties (every
//! worker plus the coordinator): the start barrier releases an iteration and
//! the end barrier harvests it.

mod barrier;

pub use barrier::{Barrier, BarrierWaitResult};
