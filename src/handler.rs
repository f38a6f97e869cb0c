//! The `russh::client::Handler` implementation.
//!
//! Host-key checking and connection-lifecycle logging live here, while the
//! per-channel data/exit/eof/close traffic is pulled out of
//! `Channel::wait()` by `pump.rs` rather than pushed through this handler,
//! since that's how `russh` exposes it. Adapted from
//! `shelldeck-ssh::handler::ClientHandler`, trimmed of the desktop app's
//! port-forwarding event plumbing (out of scope here).

use async_trait::async_trait;
use russh::client::{self, Session};
use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;

use crate::channel::ChannelRegistry;
use crate::error::Error;
use crate::known_hosts::{self, KnownHostResult, KnownHosts};

pub(crate) struct ClientHandler {
    hostname: String,
    port: u16,
    known_hosts: KnownHosts,
    registry: ChannelRegistry,
}

impl ClientHandler {
    pub(crate) fn new(
        hostname: String,
        port: u16,
        known_hosts: KnownHosts,
        registry: ChannelRegistry,
    ) -> Self {
        Self {
            hostname,
            port,
            known_hosts,
            registry,
        }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let key_type = server_public_key.name();
        let key_base64 = server_public_key.public_key_base64();

        match self.known_hosts {
            KnownHosts::Accept => Ok(true),
            KnownHosts::Strict => {
                match known_hosts::check_known_host(&self.hostname, self.port, key_type, &key_base64) {
                    KnownHostResult::Match => Ok(true),
                    KnownHostResult::Mismatch => {
                        tracing::error!(
                            "host key mismatch for {}:{} — refusing (strict mode)",
                            self.hostname,
                            self.port
                        );
                        Err(Error::HostKeyMismatch {
                            host: self.hostname.clone(),
                            port: self.port,
                        }
                        .into())
                    }
                    KnownHostResult::NotFound => {
                        tracing::error!(
                            "{}:{} not in known_hosts — refusing (strict mode)",
                            self.hostname,
                            self.port
                        );
                        Ok(false)
                    }
                }
            }
            KnownHosts::Tofu => {
                match known_hosts::check_known_host(&self.hostname, self.port, key_type, &key_base64) {
                    KnownHostResult::Match => Ok(true),
                    KnownHostResult::Mismatch => {
                        tracing::error!(
                            "HOST KEY MISMATCH for {}:{} — connection rejected",
                            self.hostname,
                            self.port
                        );
                        Err(Error::HostKeyMismatch {
                            host: self.hostname.clone(),
                            port: self.port,
                        }
                        .into())
                    }
                    KnownHostResult::NotFound => {
                        tracing::info!(
                            "new host {}:{} — adding {} key to known_hosts (TOFU)",
                            self.hostname,
                            self.port,
                            key_type
                        );
                        known_hosts::add_known_host(&self.hostname, self.port, key_type, &key_base64);
                        Ok(true)
                    }
                }
            }
        }
    }

    async fn auth_banner(&mut self, banner: &str, _session: &mut Session) -> Result<(), Self::Error> {
        tracing::info!("ssh banner: {banner}");
        Ok(())
    }

    async fn channel_open_failure(
        &mut self,
        channel: russh::ChannelId,
        reason: russh::ChannelOpenFailure,
        description: &str,
        _language: &str,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        tracing::error!("channel {channel:?} open failed: {reason:?} - {description}");
        Ok(())
    }

    async fn disconnected(
        &mut self,
        reason: client::DisconnectReason<Self::Error>,
    ) -> Result<(), Self::Error> {
        let fault = match reason {
            client::DisconnectReason::ReceivedDisconnect(info) => {
                tracing::info!("server disconnected: {info:?}");
                Error::Transport(format!("server disconnected: {info:?}"))
            }
            client::DisconnectReason::Error(e) => {
                tracing::info!("connection error: {e}");
                Error::Transport(e.to_string())
            }
        };

        // No waiter is left orphaned by a dead transport: every channel
        // still in the registry gets the fault captured and both its
        // conditions signaled, exactly as if its own close message had
        // arrived.
        for state in self.registry.drain().await {
            state.capture_fault(fault.clone());
            state.signal_open();
            state.signal_close();
        }
        Ok(())
    }
}
