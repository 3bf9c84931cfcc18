//! Waiting for the user to stop the foreground `watch` command.

use std::io;

/// Something the `watch` command blocks on before stopping the agent.
pub(crate) trait StopSignal {
    /// Blocks until a stop is requested.
    fn wait(self) -> io::Result<()>;
}

/// SIGINT and SIGTERM, installed before the agent starts so that neither
/// falls through to the default handler while the destination is being
/// reconciled.
#[cfg(unix)]
pub(crate) struct TerminationSignals {
    signals: signal_hook::iterator::Signals,
}

#[cfg(unix)]
impl TerminationSignals {
    pub(crate) fn install() -> io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let signals = signal_hook::iterator::Signals::new([SIGINT, SIGTERM])?;
        Ok(Self { signals })
    }
}

#[cfg(unix)]
impl StopSignal for TerminationSignals {
    fn wait(mut self) -> io::Result<()> {
        if let Some(signal) = self.signals.forever().next() {
            tracing::debug!(target: "lsync::dispatch", signal, "stop signal received");
        }
        self.signals.handle().close();
        Ok(())
    }
}

#[cfg(not(unix))]
pub(crate) struct TerminationSignals {
    raised: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(not(unix))]
impl TerminationSignals {
    pub(crate) fn install() -> io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        let raised = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, std::sync::Arc::clone(&raised))?;
        }
        Ok(Self { raised })
    }
}

#[cfg(not(unix))]
impl StopSignal for TerminationSignals {
    fn wait(self) -> io::Result<()> {
        const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

        while !self.raised.load(std::sync::atomic::Ordering::Relaxed) {
            std::thread::sleep(POLL_INTERVAL);
        }
        tracing::debug!(target: "lsync::dispatch", "stop signal received");
        Ok(())
    }
}
