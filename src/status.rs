//! Exit Status record.
//!
//! Constructed empty by the waiter, mutated at most once by whichever of
//! `set_exit_code`/`set_exit_signal` the server's reply triggers, and read
//! only after the waiter has joined — see `waiter.rs` for the
//! happens-before edge that makes the lack of an internal lock here sound.

use std::fmt;

/// How a remote process ended, or the fact that nothing is known yet.
///
/// Exactly one of `exit_code`/`term_signal` is populated for a normally
/// terminated process; both are `None` if the channel died before either
/// arrived — callers distinguish that case by checking the `fault` on the
/// [`crate::waiter::Waiter`] that produced this status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitStatus {
    exit_code: Option<u32>,
    term_signal: Option<String>,
    coredump: bool,
}

impl ExitStatus {
    /// A status with nothing recorded yet.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the `exit-status` channel request. Fired at most once.
    pub(crate) fn set_exit_code(&mut self, code: u32) {
        debug_assert!(
            self.exit_code.is_none() && self.term_signal.is_none(),
            "exit status mutated twice"
        );
        self.exit_code = Some(code);
    }

    /// Record the `exit-signal` channel request. Fired at most once.
    pub(crate) fn set_exit_signal(&mut self, signal_name: impl Into<String>, coredump: bool) {
        debug_assert!(
            self.exit_code.is_none() && self.term_signal.is_none(),
            "exit status mutated twice"
        );
        self.term_signal = Some(signal_name.into());
        self.coredump = coredump;
    }

    /// `true` if the process ran to completion and reported an exit code.
    pub fn exited(&self) -> bool {
        self.exit_code.is_some()
    }

    /// `true` if the process was terminated by a signal.
    pub fn signaled(&self) -> bool {
        self.term_signal.is_some()
    }

    /// The exit code, if the process exited normally (0..=255 in practice).
    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    /// The raw signal name as delivered by the server (e.g. `"QUIT"`),
    /// without translation.
    pub fn term_signal_name(&self) -> Option<&str> {
        self.term_signal.as_deref()
    }

    /// The signal translated to this system's signal number, when a mapping
    /// exists; otherwise `None` even though `signaled()` is true. Signal
    /// numbers are client-local (RFC 4254 §6.10 only specifies the name), so
    /// an unmapped name is documented behavior, not a bug.
    pub fn term_signal(&self) -> Option<i32> {
        self.term_signal
            .as_deref()
            .and_then(crate::signal::number_for_name)
    }

    /// Whether a core dump was reported alongside the terminating signal.
    /// Meaningless (and always `false`) unless `signaled()`.
    pub fn coredump(&self) -> bool {
        self.coredump
    }

    /// `Some(true)`/`Some(false)` if the process exited normally, `None`
    /// ("unknown") if it was signaled or if nothing was ever recorded. A
    /// caller must never collapse "killed" into "failed".
    pub fn success(&self) -> Option<bool> {
        self.exit_code.map(|code| code == 0)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.exit_code {
            write!(f, "exited with code {code}")
        } else if let Some(ref name) = self.term_signal {
            match self.term_signal() {
                Some(num) => write!(f, "terminated by signal {name} ({num})"),
                None => write!(f, "terminated by signal {name}"),
            }?;
            if self.coredump {
                write!(f, " (core dumped)")?;
            }
            Ok(())
        } else {
            write!(f, "uninitialized")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_by_default() {
        let status = ExitStatus::new();
        assert!(!status.exited());
        assert!(!status.signaled());
        assert_eq!(status.success(), None);
        assert_eq!(status.to_string(), "uninitialized");
    }

    #[test]
    fn exit_code_zero_is_success() {
        let mut status = ExitStatus::new();
        status.set_exit_code(0);
        assert!(status.exited());
        assert_eq!(status.success(), Some(true));
    }

    #[test]
    fn nonzero_exit_is_not_success() {
        let mut status = ExitStatus::new();
        status.set_exit_code(3);
        assert_eq!(status.exit_code(), Some(3));
        assert_eq!(status.success(), Some(false));
    }

    #[test]
    fn signaled_success_is_unknown_not_false() {
        let mut status = ExitStatus::new();
        status.set_exit_signal("QUIT", true);
        assert!(status.signaled());
        assert!(!status.exited());
        assert_eq!(status.success(), None, "killed must not read as failed");
        assert!(status.coredump());
    }

    #[test]
    fn unmapped_signal_name_surfaces_raw() {
        let mut status = ExitStatus::new();
        status.set_exit_signal("SIG@vendor.example.com", false);
        assert_eq!(status.term_signal_name(), Some("SIG@vendor.example.com"));
        assert_eq!(status.term_signal(), None);
    }
}
