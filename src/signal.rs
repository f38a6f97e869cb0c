//! Best-effort translation of SSH `exit-signal` names (RFC 4254 §6.10) to
//! this system's signal numbers. Unknown names (and implementation-defined
//! `SIG@vendor` names) are left to the caller as the raw string rather than
//! translated, since RFC 4254 only standardizes the name.

#[cfg(unix)]
pub(crate) fn number_for_name(name: &str) -> Option<i32> {
    // RFC 4254 names omit the "SIG" prefix; accept both forms, and accept
    // implementation-defined "SIG@vendor" names only by falling through to
    // `None` below since they carry no portable meaning.
    let bare = name.strip_prefix("SIG").unwrap_or(name);

    let number = match bare {
        "HUP" => libc::SIGHUP,
        "INT" => libc::SIGINT,
        "QUIT" => libc::SIGQUIT,
        "ILL" => libc::SIGILL,
        "TRAP" => libc::SIGTRAP,
        "ABRT" => libc::SIGABRT,
        "BUS" => libc::SIGBUS,
        "FPE" => libc::SIGFPE,
        "KILL" => libc::SIGKILL,
        "USR1" => libc::SIGUSR1,
        "SEGV" => libc::SIGSEGV,
        "USR2" => libc::SIGUSR2,
        "PIPE" => libc::SIGPIPE,
        "ALRM" => libc::SIGALRM,
        "TERM" => libc::SIGTERM,
        "CHLD" => libc::SIGCHLD,
        "CONT" => libc::SIGCONT,
        "STOP" => libc::SIGSTOP,
        "TSTP" => libc::SIGTSTP,
        "TTIN" => libc::SIGTTIN,
        "TTOU" => libc::SIGTTOU,
        "XCPU" => libc::SIGXCPU,
        "XFSZ" => libc::SIGXFSZ,
        "VTALRM" => libc::SIGVTALRM,
        "PROF" => libc::SIGPROF,
        "WINCH" => libc::SIGWINCH,
        "SYS" => libc::SIGSYS,
        _ => return None,
    };
    Some(number)
}

#[cfg(not(unix))]
pub(crate) fn number_for_name(_name: &str) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn known_names_translate() {
        assert_eq!(number_for_name("QUIT"), Some(libc::SIGQUIT));
        assert_eq!(number_for_name("SIGQUIT"), Some(libc::SIGQUIT));
        assert_eq!(number_for_name("TERM"), Some(libc::SIGTERM));
    }

    #[test]
    fn unknown_names_are_none() {
        assert_eq!(number_for_name("SIG@vendor.example.com"), None);
        assert_eq!(number_for_name("NOTASIGNAL"), None);
    }
}
