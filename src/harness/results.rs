//! Per-iteration, per-task measurement storage.
//!
//! The store is three flat matrices (`start`, `finish`, `loops`) of
//! `iterations x tasks` relaxed atomics. Cell `(l, i)` is written only by
//! worker `i`, between its start-barrier return and its end-barrier call in
//! iteration `l`; it is read only after the end barrier of that iteration.
//! The barrier's lock provides the happens-before edge, so the cells need no
//! lock of their own and relaxed ordering is enough.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};

/// One worker's measurement for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Wake-up time after the iteration's reference instant.
    pub start: Duration,
    /// Busy-work completion time after the iteration's reference instant.
    pub finish: Duration,
    /// Busy-loop iterations completed.
    pub loops: u64,
}

impl Sample {
    /// Creates a sample from microsecond values, mostly for tests and tools.
    #[must_use]
    pub const fn from_micros(start: u64, finish: u64, loops: u64) -> Self {
        Self {
            start: Duration::from_micros(start),
            finish: Duration::from_micros(finish),
            loops,
        }
    }

    /// Time spent between waking and finishing the busy-work.
    #[must_use]
    pub fn run_time(&self) -> Duration {
        self.finish.saturating_sub(self.start)
    }
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

fn alloc_cells(cells: usize) -> Result<Box<[AtomicU64]>> {
    let mut matrix = Vec::new();
    matrix
        .try_reserve_exact(cells)
        .map_err(|source| Error::Allocation { cells, source })?;
    matrix.extend((0..cells).map(|_| AtomicU64::new(0)));
    Ok(matrix.into_boxed_slice())
}

/// Shared result matrices written by the workers during a run.
#[derive(Debug)]
pub struct ResultStore {
    tasks: usize,
    capacity: usize,
    start: Box<[AtomicU64]>,
    finish: Box<[AtomicU64]>,
    loops: Box<[AtomicU64]>,
}

impl ResultStore {
    /// Allocates zeroed matrices for `iterations` rows of `tasks` cells.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the memory cannot be reserved.
    pub fn try_new(iterations: usize, tasks: usize) -> Result<Self> {
        // An overflowing size is reported through the allocator error.
        let cells = iterations.checked_mul(tasks).unwrap_or(usize::MAX);
        Ok(Self {
            tasks,
            capacity: iterations,
            start: alloc_cells(cells)?,
            finish: alloc_cells(cells)?,
            loops: alloc_cells(cells)?,
        })
    }

    /// Number of tasks per row.
    #[must_use]
    pub fn tasks(&self) -> usize {
        self.tasks
    }

    /// Number of rows the store can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index(&self, iteration: usize, task: usize) -> Option<usize> {
        (iteration < self.capacity && task < self.tasks).then(|| iteration * self.tasks + task)
    }

    /// Writes one cell. Out-of-range coordinates are ignored and return
    /// `false`.
    ///
    /// Must only be called by worker `task` while it is inside iteration
    /// `iteration`.
    pub fn record(&self, iteration: usize, task: usize, sample: Sample) -> bool {
        let Some(index) = self.index(iteration, task) else {
            return false;
        };
        self.start[index].store(as_nanos(sample.start), Ordering::Relaxed);
        self.finish[index].store(as_nanos(sample.finish), Ordering::Relaxed);
        self.loops[index].store(sample.loops, Ordering::Relaxed);
        true
    }

    /// Reads one cell. Out-of-range coordinates read as an empty sample.
    #[must_use]
    pub fn sample(&self, iteration: usize, task: usize) -> Sample {
        self.index(iteration, task)
            .map(|index| Sample {
                start: Duration::from_nanos(self.start[index].load(Ordering::Relaxed)),
                finish: Duration::from_nanos(self.finish[index].load(Ordering::Relaxed)),
                loops: self.loops[index].load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }

    /// Reads a full row in task order.
    #[must_use]
    pub fn row(&self, iteration: usize) -> Vec<Sample> {
        (0..self.tasks)
            .map(|task| self.sample(iteration, task))
            .collect()
    }

    /// Copies the first `iterations` rows into an owned snapshot.
    #[must_use]
    pub fn snapshot(&self, iterations: usize) -> RunResults {
        let rows = (0..iterations.min(self.capacity))
            .map(|iteration| self.row(iteration))
            .collect();
        RunResults {
            tasks: self.tasks,
            rows,
        }
    }
}

/// Owned copy of the recorded rows, handed to reporting after the run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResults {
    tasks: usize,
    rows: Vec<Vec<Sample>>,
}

impl RunResults {
    /// Builds results directly from rows, e.g. for offline analysis.
    ///
    /// # Panics
    /// Panics if a row does not have exactly `tasks` samples.
    #[must_use]
    pub fn from_rows(tasks: usize, rows: Vec<Vec<Sample>>) -> Self {
        assert!(
            rows.iter().all(|row| row.len() == tasks),
            "every row needs {tasks} samples"
        );
        Self { tasks, rows }
    }

    /// Number of tasks per row.
    #[must_use]
    pub fn tasks(&self) -> usize {
        self.tasks
    }

    /// Number of recorded iterations.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.rows.len()
    }

    /// Returns one row.
    #[must_use]
    pub fn row(&self, iteration: usize) -> Option<&[Sample]> {
        self.rows.get(iteration).map(Vec::as_slice)
    }

    /// Iterates over all rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[Sample]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Summarizes the wake-up latency of one task across all rows.
    #[must_use]
    pub fn task_stats(&self, task: usize) -> TaskStats {
        let mut stats = TaskStats::default();
        let mut count: u32 = 0;
        for sample in self.rows.iter().filter_map(|row| row.get(task)) {
            if count == 0 || sample.start < stats.min {
                stats.min = sample.start;
            }
            stats.max = stats.max.max(sample.start);
            stats.total += sample.start;
            count = count.saturating_add(1);
        }
        if count > 0 {
            stats.avg = stats.total / count;
        }
        stats
    }
}

/// Wake-up latency summary for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    /// Smallest start latency.
    pub min: Duration,
    /// Mean start latency.
    pub avg: Duration,
    /// Largest start latency.
    pub max: Duration,
    /// Sum of start latencies.
    pub total: Duration,
}
