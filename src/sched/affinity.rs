//! CPU affinity masks and the migration rotation cursor.

use std::io;

/// The set of CPUs a thread may run on, as a sorted list of CPU numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuSet {
    cpus: Vec<usize>,
}

impl CpuSet {
    /// Builds a set from explicit CPU numbers.
    #[must_use]
    pub fn from_cpus(cpus: impl IntoIterator<Item = usize>) -> Self {
        let mut cpus: Vec<usize> = cpus.into_iter().collect();
        cpus.sort_unstable();
        cpus.dedup();
        Self { cpus }
    }

    /// Returns the affinity mask of the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error from `sched_getaffinity(2)`.
    #[cfg(target_os = "linux")]
    pub fn current() -> io::Result<Self> {
        // SAFETY: an all-zero cpu_set_t is the empty set.
        let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        // SAFETY: pid 0 is the calling thread; the size matches `set`.
        let ret = unsafe {
            libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &raw mut set)
        };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        let limit = usize::try_from(libc::CPU_SETSIZE).unwrap_or(0);
        // SAFETY: every index is below CPU_SETSIZE.
        let cpus = (0..limit).filter(|&cpu| unsafe { libc::CPU_ISSET(cpu, &set) });
        Ok(Self::from_cpus(cpus))
    }

    /// Returns the affinity mask of the calling thread.
    ///
    /// # Errors
    ///
    /// Always fails on this platform.
    #[cfg(not(target_os = "linux"))]
    pub fn current() -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "CPU affinity requires Linux",
        ))
    }

    /// Returns the CPU numbers in ascending order.
    #[must_use]
    pub fn cpus(&self) -> &[usize] {
        &self.cpus
    }

    /// Returns the number of CPUs in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }
}

/// Pins the calling thread to a single CPU.
///
/// # Errors
///
/// Returns the OS error from `sched_setaffinity(2)`.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpu: usize) -> io::Result<()> {
    let limit = usize::try_from(libc::CPU_SETSIZE).unwrap_or(0);
    if cpu >= limit {
        return Err(io::Error::from(io::ErrorKind::InvalidInput));
    }
    // SAFETY: an all-zero cpu_set_t is the empty set.
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `cpu` was bounds-checked above.
    unsafe { libc::CPU_SET(cpu, &mut set) };
    // SAFETY: pid 0 is the calling thread; the size matches `set`.
    let ret =
        unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &raw const set) };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Pins the calling thread to a single CPU.
///
/// # Errors
///
/// Always fails on this platform.
#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_cpu: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "CPU affinity requires Linux",
    ))
}

/// Round-robin cursor over the CPUs of an affinity mask.
///
/// Only the highest-priority worker owns one: before every release it hops
/// to the next CPU of the mask it started with, so the scheduler has to
/// migrate lower-priority tasks out of its way.
#[derive(Debug, Clone)]
pub struct CpuRotation {
    set: CpuSet,
    cursor: usize,
}

impl CpuRotation {
    /// Creates a rotation over `set`, starting at its lowest CPU.
    #[must_use]
    pub fn new(set: CpuSet) -> Self {
        Self { set, cursor: 0 }
    }

    /// Returns the next CPU in the rotation, or `None` for an empty set.
    pub fn next_cpu(&mut self) -> Option<usize> {
        if self.set.is_empty() {
            return None;
        }
        if self.cursor >= self.set.len() {
            self.cursor = 0;
        }
        let cpu = self.set.cpus()[self.cursor];
        self.cursor += 1;
        Some(cpu)
    }

    /// Pins the calling thread to the next CPU in the rotation.
    ///
    /// Returns the CPU that was selected, or `None` when there is nothing to
    /// rotate over or the kernel refused the mask.
    pub fn rotate(&mut self) -> Option<usize> {
        let cpu = self.next_cpu()?;
        match pin_current_thread(cpu) {
            Ok(()) => Some(cpu),
            Err(err) => {
                tracing::trace!(cpu, error = %err, "cpu rotation refused");
                None
            }
        }
    }
}
