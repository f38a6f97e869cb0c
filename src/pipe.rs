//! Local byte-stream pipe plumbing: a command's caller-visible stdin,
//! stdout, and stderr are plain byte streams.
//!
//! Each of a command's three standard streams gets an in-process duplex
//! pipe: one end is handed back to the caller as a plain `AsyncRead`/
//! `AsyncWrite` handle, the other is handed to the pump task
//! (`pump::PumpEndpoints`) as its stdin source or stdout/stderr sink.
//! `tokio::io::duplex` already gives us both directions of a single pipe;
//! we only ever drive one direction on each side, but boxing the unused
//! half costs nothing worth avoiding.

use tokio::io::{self, DuplexStream};

/// Matches the default window tokio gives a duplex pipe's underlying
/// channel; large enough that a command's output isn't throttled by the
/// in-process hop before the caller has a chance to read it.
const BUFFER_SIZE: usize = 64 * 1024;

/// One end goes to the caller, the other to the pump.
pub(crate) struct Pipe {
    pub(crate) caller: DuplexStream,
    pub(crate) remote: DuplexStream,
}

pub(crate) fn new_pipe() -> Pipe {
    let (caller, remote) = io::duplex(BUFFER_SIZE);
    Pipe { caller, remote }
}
