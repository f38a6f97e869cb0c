//! Pipe façade: `popen2`/`popen2e`/`popen3` open a command and hand back
//! live pipe endpoints plus a waiter; `capture2`/`capture2e`/`capture3`
//! additionally drive those pipes to completion and collect the bytes.
//! These are thin, "just wire the pieces together" wrappers composed from
//! `Session`, `Command`, and `pipe.rs` rather than folded into the
//! channel/waiter core.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::channel::ChannelWrapper;
use crate::command::Command;
use crate::pipe::new_pipe;
use crate::pump::PumpEndpoints;
use crate::session::Session;
use crate::status::ExitStatus;
use crate::waiter::Waiter;

/// A running remote command with caller-visible pipe endpoints. Which of
/// `stdin`/`stdout`/`stderr` are populated depends on which `popen*`
/// function created it.
pub struct RemoteProcess {
    pub stdin: Option<tokio::io::DuplexStream>,
    pub stdout: Option<tokio::io::DuplexStream>,
    pub stderr: Option<tokio::io::DuplexStream>,
    channel: ChannelWrapper,
    waiter: Waiter,
}

impl RemoteProcess {
    /// Block until the server has confirmed or refused the channel.
    pub async fn wait_open(&self) -> crate::Result<()> {
        self.channel.wait_open().await
    }

    /// Block until the remote command exits and return its terminal status.
    pub async fn wait(&self) -> crate::Result<ExitStatus> {
        self.waiter.wait().await
    }

    /// Non-blocking peek at the terminal status.
    pub fn try_status(&self) -> Option<ExitStatus> {
        self.waiter.try_status()
    }

    /// Drop the stdin handle, signaling end-of-input to the remote command.
    pub fn close_stdin(&mut self) {
        self.stdin.take();
    }
}

/// Open `command`, wiring its stdin and stdout to fresh local pipes; stderr
/// is not captured (dropped on arrival, still visible to a `Logger`).
pub async fn popen2(session: &Session, command: Command) -> crate::Result<RemoteProcess> {
    open(session, command, Wiring::StdinStdout).await
}

/// Like [`popen2`], but stderr is merged into the stdout stream instead of
/// being discarded.
pub async fn popen2e(session: &Session, command: Command) -> crate::Result<RemoteProcess> {
    open(session, command, Wiring::StdinStdoutMerged).await
}

/// Open `command` with stdin, stdout, and stderr each wired to their own
/// local pipe.
pub async fn popen3(session: &Session, command: Command) -> crate::Result<RemoteProcess> {
    open(session, command, Wiring::StdinStdoutStderr).await
}

enum Wiring {
    StdinStdout,
    StdinStdoutMerged,
    StdinStdoutStderr,
}

async fn open(session: &Session, command: Command, wiring: Wiring) -> crate::Result<RemoteProcess> {
    let stdin_pipe = new_pipe();
    let stdout_pipe = new_pipe();

    let (stderr_sink, stderr_caller) = match wiring {
        Wiring::StdinStdoutStderr => {
            let pipe = new_pipe();
            let sink: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = Box::new(pipe.remote);
            (Some(sink), Some(pipe.caller))
        }
        _ => (None, None),
    };

    let endpoints = PumpEndpoints {
        stdin: Some(Box::new(stdin_pipe.remote)),
        stdout: Some(Box::new(stdout_pipe.remote)),
        stderr: stderr_sink,
        merge_stderr: matches!(wiring, Wiring::StdinStdoutMerged),
        logger: command.logger_handle(),
    };

    let (channel, waiter) = command.open(session, endpoints).await?;

    Ok(RemoteProcess {
        stdin: Some(stdin_pipe.caller),
        stdout: Some(stdout_pipe.caller),
        stderr: stderr_caller,
        channel,
        waiter,
    })
}

/// Write `stdin_data` while concurrently reading stdout to completion, then
/// return the collected bytes alongside the terminal [`ExitStatus`].
///
/// The write and the read run side by side rather than write-then-read: the
/// pump's stdin and stdout pipes are both bounded, so if the remote command
/// produces output before consuming all of `stdin_data` — `cat` being the
/// obvious example — writing to completion first would stall once the
/// stdout pipe fills up and nobody is yet draining it.
pub async fn capture2(
    session: &Session,
    command: Command,
    stdin_data: &[u8],
) -> crate::Result<(Vec<u8>, ExitStatus)> {
    let mut process = popen2(session, command).await?;
    process.wait_open().await?;

    let stdin = process.stdin.take();
    let stdout_reader = process.stdout.take();

    let write_stdin = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(stdin_data).await?;
        }
        Ok::<(), crate::Error>(())
    };

    let mut stdout = Vec::new();
    let read_stdout = async {
        if let Some(mut reader) = stdout_reader {
            reader.read_to_end(&mut stdout).await?;
        }
        Ok::<(), crate::Error>(())
    };

    tokio::try_join!(write_stdin, read_stdout)?;

    let status = process.wait().await?;
    Ok((stdout, status))
}

/// Like [`capture2`], with stderr merged into the returned byte stream.
pub async fn capture2e(
    session: &Session,
    command: Command,
    stdin_data: &[u8],
) -> crate::Result<(Vec<u8>, ExitStatus)> {
    let mut process = popen2e(session, command).await?;
    process.wait_open().await?;

    let stdin = process.stdin.take();
    let stdout_reader = process.stdout.take();

    let write_stdin = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(stdin_data).await?;
        }
        Ok::<(), crate::Error>(())
    };

    let mut merged = Vec::new();
    let read_stdout = async {
        if let Some(mut reader) = stdout_reader {
            reader.read_to_end(&mut merged).await?;
        }
        Ok::<(), crate::Error>(())
    };

    tokio::try_join!(write_stdin, read_stdout)?;

    let status = process.wait().await?;
    Ok((merged, status))
}

/// Like [`capture2`], returning stdout and stderr as two separate buffers.
pub async fn capture3(
    session: &Session,
    command: Command,
    stdin_data: &[u8],
) -> crate::Result<(Vec<u8>, Vec<u8>, ExitStatus)> {
    let mut process = popen3(session, command).await?;
    process.wait_open().await?;

    let stdin = process.stdin.take();
    let stdout_reader = process.stdout.take();
    let stderr_reader = process.stderr.take();

    let write_stdin = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(stdin_data).await?;
        }
        Ok::<(), crate::Error>(())
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let read_streams = async {
        match (stdout_reader, stderr_reader) {
            (Some(mut out), Some(mut err)) => {
                tokio::try_join!(out.read_to_end(&mut stdout), err.read_to_end(&mut stderr))?;
            }
            (Some(mut out), None) => {
                out.read_to_end(&mut stdout).await?;
            }
            (None, Some(mut err)) => {
                err.read_to_end(&mut stderr).await?;
            }
            (None, None) => {}
        }
        Ok::<(), crate::Error>(())
    };

    tokio::try_join!(write_stdin, read_streams)?;

    let status = process.wait().await?;
    Ok((stdout, stderr, status))
}
