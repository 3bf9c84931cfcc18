//! Verbosity configuration mapping `-v` counts onto per-subsystem levels.

use std::fmt;

use tracing::level_filters::LevelFilter;

/// Subsystems that emit structured diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subsystem {
    /// Watch registration and removal.
    Watch,
    /// Directory creation and file copies.
    Copy,
    /// Removal of destination entries.
    Delete,
    /// Notification classification and the dispatch loop.
    Dispatch,
    /// Reconciliation and seeding walks.
    Walk,
}

impl Subsystem {
    /// Every subsystem, in directive order.
    pub const ALL: [Self; 5] = [
        Self::Watch,
        Self::Copy,
        Self::Delete,
        Self::Dispatch,
        Self::Walk,
    ];

    /// Returns the `tracing` target used by the subsystem.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Watch => "lsync::watch",
            Self::Copy => "lsync::copy",
            Self::Delete => "lsync::delete",
            Self::Dispatch => "lsync::dispatch",
            Self::Walk => "lsync::walk",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Watch => 0,
            Self::Copy => 1,
            Self::Delete => 2,
            Self::Dispatch => 3,
            Self::Walk => 4,
        }
    }
}

/// Per-subsystem level filters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VerbosityConfig {
    levels: [LevelFilter; 5],
}

impl Default for VerbosityConfig {
    fn default() -> Self {
        Self::from_verbose_level(0)
    }
}

impl VerbosityConfig {
    /// Builds the configuration for a `-v` count.
    ///
    /// - `0`: warnings only.
    /// - `1`: copy, delete and watch activity at `info`.
    /// - `2`: every subsystem at `info`, dispatch at `debug`.
    /// - `3` and above: `debug` everywhere, dispatch and walk at `trace`.
    #[must_use]
    pub fn from_verbose_level(level: u8) -> Self {
        use LevelFilter as L;

        let levels = match level {
            0 => [L::WARN; 5],
            1 => [L::INFO, L::INFO, L::INFO, L::WARN, L::WARN],
            2 => [L::INFO, L::INFO, L::INFO, L::DEBUG, L::INFO],
            _ => [L::DEBUG, L::DEBUG, L::DEBUG, L::TRACE, L::TRACE],
        };
        Self { levels }
    }

    /// Returns the level configured for `subsystem`.
    #[must_use]
    pub const fn level(&self, subsystem: Subsystem) -> LevelFilter {
        self.levels[subsystem.index()]
    }

    /// Overrides the level for a single subsystem.
    #[must_use]
    pub const fn with_level(mut self, subsystem: Subsystem, level: LevelFilter) -> Self {
        self.levels[subsystem.index()] = level;
        self
    }

    /// Reports whether events at `level` for `subsystem` are enabled.
    #[must_use]
    pub fn enabled(&self, subsystem: Subsystem, level: tracing::Level) -> bool {
        self.level(subsystem) >= level
    }

    /// Renders the configuration as `EnvFilter` directives.
    #[must_use]
    pub fn directives(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VerbosityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("warn")?;
        for subsystem in Subsystem::ALL {
            let level = self.level(subsystem).to_string().to_ascii_lowercase();
            write!(f, ",{}={level}", subsystem.target())?;
        }
        Ok(())
    }
}
