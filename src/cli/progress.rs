//! Progress bar for interactive runs.
//!
//! The bar goes to stderr so stdout can be redirected to capture just the
//! report. Each update rewrites the line in place:
//!
//! ```text
//! |-----------------------------                                         |
//! ```

use std::io::{self, Write};

use crate::harness::ProgressSink;

/// Width of the bar between the two `|` characters.
pub const BAR_WIDTH: usize = 70;

/// Renders iteration progress as a fixed-width text bar.
#[derive(Debug)]
pub struct ProgressBar<W: Write = io::Stderr> {
    writer: W,
    width: usize,
    drawn: bool,
}

impl ProgressBar<io::Stderr> {
    /// Creates a bar that draws on stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(io::stderr())
    }
}

impl<W: Write> ProgressBar<W> {
    /// Creates a bar that draws on `writer`.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            width: BAR_WIDTH,
            drawn: false,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Draws the bar at `percent` (clamped to 100).
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn draw(&mut self, percent: usize) -> io::Result<()> {
        let filled = self.width * percent.min(100) / 100;
        write!(
            self.writer,
            "\r|{}{}|",
            "-".repeat(filled),
            " ".repeat(self.width - filled)
        )?;
        self.drawn = true;
        self.writer.flush()
    }

    /// Ends the bar's line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn close(&mut self) -> io::Result<()> {
        if self.drawn {
            writeln!(self.writer)?;
            self.drawn = false;
        }
        self.writer.flush()
    }
}

impl<W: Write> ProgressSink for ProgressBar<W> {
    fn begin(&mut self, _total: usize) {
        // A broken stderr must not abort the measurement.
        let _ = self.draw(0);
    }

    fn iteration(&mut self, completed: usize, total: usize) {
        if total > 0 {
            let _ = self.draw(completed * 100 / total);
        }
    }

    fn finish(&mut self) {
        let _ = self.close();
    }
}
