//! Channel pump.
//!
//! One task per channel, spawned right after `wait_open()` succeeds. It owns
//! the `russh::Channel` for the rest of its life and is the only place that
//! calls `channel.wait()` — in a pull-based async API the callback installer
//! a blocking library would register becomes the body of a loop instead.
//! Adapted from the dispatch loops in
//! `shelldeck-ssh::session::{exec, exec_streaming, exec_cancellable}`,
//! generalized to also pump stdin and to route through the caller-supplied
//! sinks/`Logger` instead of a fixed `Vec<u8>`/`mpsc` sink.

use std::io;
use std::sync::Arc;

use russh::ChannelMsg;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::channel::{ChannelRegistry, ChannelState};
use crate::logger::Logger;

/// Slack subtracted from the negotiated max packet size before chunking
/// stdin writes, to leave room for the SSH channel-data framing overhead.
const HEADER_SLACK: usize = 512;

/// `russh` does not currently expose the server's negotiated max packet
/// size back to the caller, so we chunk stdin against the protocol's common
/// default (RFC 4254 recommends 32768) rather than inventing an API that
/// isn't there. If a future `russh` release exposes it, plug it in here.
const DEFAULT_MAX_PACKET: usize = 32768;

fn stdin_pump_unit(remote_max_packet: usize) -> usize {
    std::cmp::max(1024, remote_max_packet.saturating_sub(HEADER_SLACK))
}

/// The caller-supplied endpoints a pump task bridges to the channel: an
/// optional stdin source, optional stdout/stderr sinks, and the logger that
/// gets a look at every chunk regardless of whether a sink is attached.
pub(crate) struct PumpEndpoints {
    pub(crate) stdin: Option<Box<dyn tokio::io::AsyncRead + Unpin + Send>>,
    pub(crate) stdout: Option<Box<dyn tokio::io::AsyncWrite + Unpin + Send>>,
    pub(crate) stderr: Option<Box<dyn tokio::io::AsyncWrite + Unpin + Send>>,
    /// `popen2e`-style merge: extended-data (stderr) is written to the
    /// `stdout` sink instead of `stderr`, which is left `None` in that mode.
    pub(crate) merge_stderr: bool,
    pub(crate) logger: Arc<dyn Logger>,
}

/// Spawn the pump task for a freshly opened channel. Deregisters itself from
/// `registry` and signals the close condition when the channel dies, so the
/// registry never accumulates channels nobody is waiting on anymore.
pub(crate) fn spawn_pump(
    mut channel: russh::Channel<russh::client::Msg>,
    id: russh::ChannelId,
    state: Arc<ChannelState>,
    mut endpoints: PumpEndpoints,
    registry: ChannelRegistry,
) {
    tokio::spawn(async move {
        run_pump(&mut channel, &state, &mut endpoints).await;
        registry.remove(&id).await;
        state.signal_close();
    });
}

async fn run_pump(
    channel: &mut russh::Channel<russh::client::Msg>,
    state: &ChannelState,
    endpoints: &mut PumpEndpoints,
) {
    let unit = stdin_pump_unit(DEFAULT_MAX_PACKET);
    let mut stdin_buf = vec![0u8; unit];
    let mut stdin_open = endpoints.stdin.is_some();

    loop {
        let stdin_read = async {
            match endpoints.stdin.as_mut() {
                Some(src) if stdin_open => src.read(&mut stdin_buf).await,
                _ => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { data }) => {
                        endpoints.logger.stdout(&data);
                        if let Some(sink) = endpoints.stdout.as_mut() {
                            write_chunk(sink, &data, &endpoints.logger, "stdout").await;
                        }
                    }
                    Some(ChannelMsg::ExtendedData { data, ext }) => {
                        if ext == 1 {
                            endpoints.logger.stderr(&data);
                            let sink = if endpoints.merge_stderr {
                                endpoints.stdout.as_mut()
                            } else {
                                endpoints.stderr.as_mut()
                            };
                            if let Some(sink) = sink {
                                write_chunk(sink, &data, &endpoints.logger, "stderr").await;
                            }
                        } else {
                            endpoints
                                .logger
                                .warn(&format!("dropping unknown extended-data type {ext}"));
                        }
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        state.with_status_mut(|s| s.set_exit_code(exit_status));
                    }
                    Some(ChannelMsg::ExitSignal { signal_name, core_dumped, .. }) => {
                        state.with_status_mut(|s| s.set_exit_signal(signal_name.to_string(), core_dumped));
                    }
                    // Eof ends the data streams but the channel can still
                    // deliver exit-status/exit-signal afterwards, so we keep
                    // looping and just stop forwarding further writes.
                    Some(ChannelMsg::Eof) => {
                        if let Some(mut sink) = endpoints.stdout.take() {
                            let _ = sink.shutdown().await;
                        }
                        if let Some(mut sink) = endpoints.stderr.take() {
                            let _ = sink.shutdown().await;
                        }
                    }
                    // The channel is gone: exit-status/exit-signal (if any)
                    // already arrived above this point, satisfying the
                    // ordering guarantee that they complete before close.
                    None => {
                        if stdin_open {
                            let _ = channel.eof().await;
                        }
                        break;
                    }
                    _ => {}
                }
            }

            n = stdin_read, if stdin_open => {
                match n {
                    Ok(0) => {
                        stdin_open = false;
                        let _ = channel.eof().await;
                    }
                    Ok(n) => {
                        let chunk = stdin_buf[..n].to_vec();
                        endpoints.logger.stdin(&chunk);
                        if let Err(e) = channel.data(io::Cursor::new(chunk)).await {
                            endpoints.logger.warn(&format!("stdin forward failed: {e}"));
                            stdin_open = false;
                        }
                    }
                    Err(e) => {
                        endpoints.logger.warn(&format!("stdin read failed: {e}"));
                        stdin_open = false;
                        let _ = channel.eof().await;
                    }
                }
            }
        }
    }
}

async fn write_chunk(
    sink: &mut (dyn tokio::io::AsyncWrite + Unpin + Send),
    data: &[u8],
    logger: &Arc<dyn Logger>,
    which: &str,
) {
    if let Err(e) = sink.write_all(data).await {
        logger.warn(&format!("{which} write failed: {e}"));
    } else if let Err(e) = sink.flush().await {
        logger.warn(&format!("{which} flush failed: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_pump_unit_has_a_floor() {
        assert_eq!(stdin_pump_unit(0), 1024);
        assert_eq!(stdin_pump_unit(256), 1024);
    }

    #[test]
    fn stdin_pump_unit_subtracts_header_slack() {
        assert_eq!(stdin_pump_unit(DEFAULT_MAX_PACKET), DEFAULT_MAX_PACKET - HEADER_SLACK);
    }
}
