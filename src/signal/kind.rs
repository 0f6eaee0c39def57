//! Signal kinds the harness can be stopped by.

/// Unix signals that request a clean stop of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SignalKind {
    /// SIGINT - Interrupt from keyboard (Ctrl+C).
    Interrupt,
    /// SIGTERM - Termination signal.
    Terminate,
    /// SIGALRM - Timer signal.
    Alarm,
    /// SIGUSR1 - User-defined signal 1.
    User1,
}

impl SignalKind {
    /// Signals the command-line tool listens for by default.
    pub const DEFAULT_STOP_SIGNALS: [Self; 3] = [Self::Interrupt, Self::Terminate, Self::Alarm];

    const ALL: [Self; 4] = [
        Self::Interrupt,
        Self::Terminate,
        Self::Alarm,
        Self::User1,
    ];

    /// Returns the platform signal number on Unix.
    #[cfg(unix)]
    #[must_use]
    pub const fn as_raw_value(&self) -> i32 {
        match self {
            Self::Interrupt => libc::SIGINT,
            Self::Terminate => libc::SIGTERM,
            Self::Alarm => libc::SIGALRM,
            Self::User1 => libc::SIGUSR1,
        }
    }

    /// Maps a raw signal number back to a kind.
    #[cfg(unix)]
    #[must_use]
    pub fn from_raw_value(raw: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_raw_value() == raw)
    }

    /// Returns the name of the signal.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Alarm => "SIGALRM",
            Self::User1 => "SIGUSR1",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
