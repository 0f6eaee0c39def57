//! Stop requests from signals and callers.
//!
//! # Components
//!
//! - [`SignalKind`]: the Unix signals that can stop a run
//! - [`StopController`]: cloneable stop flag polled by the coordinator
//! - [`StopCause`]: why a stop was requested
//!
//! Signal handlers only record the signal number in an atomic. The
//! coordinator turns a pending stop into a clean shutdown at the next
//! iteration boundary, so no worker is ever left parked on a barrier.

mod handler;
mod kind;
mod shutdown;

pub use kind::SignalKind;
pub use shutdown::{StopCause, StopController};
