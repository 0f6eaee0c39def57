//! Real-time scheduling primitives for the calling thread.
//!
//! Thin wrappers over `sched_setscheduler(2)`, `sched_getaffinity(2)` and
//! `sched_setaffinity(2)`. Every function acts on the calling thread only;
//! the harness calls them from inside each worker.
//!
//! On non-Linux targets the setters return [`io::ErrorKind::Unsupported`],
//! which the harness treats the same as a missing `CAP_SYS_NICE`: the run
//! continues at default scheduling.

use std::io;

mod affinity;

pub use affinity::{CpuRotation, CpuSet, pin_current_thread};

/// Switches the calling thread to `SCHED_FIFO` at `priority`.
///
/// # Errors
///
/// Returns the OS error, typically `EPERM` without `CAP_SYS_NICE` or
/// `EINVAL` for a priority outside `1..=99`.
#[cfg(target_os = "linux")]
pub fn set_fifo_priority(priority: i32) -> io::Result<()> {
    // SAFETY: an all-zero sched_param is valid on every libc flavour.
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = priority;
    // SAFETY: pid 0 is the calling thread and `param` outlives the call.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &raw const param) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Switches the calling thread to `SCHED_FIFO` at `priority`.
///
/// # Errors
///
/// Always fails on this platform.
#[cfg(not(target_os = "linux"))]
pub fn set_fifo_priority(_priority: i32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "SCHED_FIFO requires Linux",
    ))
}

/// Returns the kernel thread id of the calling thread.
#[cfg(target_os = "linux")]
pub fn current_thread_id() -> i64 {
    // SAFETY: gettid takes no arguments and cannot fail.
    i64::from(unsafe { libc::syscall(libc::SYS_gettid) })
}

/// Returns the kernel thread id of the calling thread.
#[cfg(not(target_os = "linux"))]
pub fn current_thread_id() -> i64 {
    i64::from(std::process::id())
}

/// Returns the number of online CPUs (at least 1).
pub fn online_cpus() -> usize {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: sysconf has no memory-safety preconditions.
        let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if let Ok(count) = usize::try_from(online) {
            if count > 0 {
                return count;
            }
        }
    }
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
