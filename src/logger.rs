//! Logger interface.
//!
//! Optional hooks (`init`/`stdin`/`stdout`/`stderr`) are default no-op
//! trait methods rather than a runtime capability probe — a caller who
//! doesn't override them pays no per-chunk cost.

/// A sink for both free-form log messages and (optionally) the raw bytes of
/// a command's stdin/stdout/stderr.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Fired once per channel open, before `exec`.
    fn init(&self, host: &str, cmdline: &str, pty: bool) {
        let _ = (host, cmdline, pty);
    }

    fn stdin(&self, _bytes: &[u8]) {}
    fn stdout(&self, _bytes: &[u8]) {}
    fn stderr(&self, _bytes: &[u8]) {}
}

/// Default logger: forwards everything to the `tracing` crate, matching the
/// teacher's `tracing::info!`/`tracing::warn!` idiom used for the crate's
/// own internal logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn init(&self, host: &str, cmdline: &str, pty: bool) {
        tracing::debug!(host, cmdline, pty, "opening remote channel");
    }
}

/// A logger that discards everything. Used as the default when a caller
/// doesn't supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
