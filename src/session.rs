//! Session Loop.
//!
//! `Session` owns the one `russh::client::Handle` a connection gets and
//! serializes every call into it behind a `tokio::sync::Mutex` — the
//! "channels mutex" composing over a library that already runs its own
//! background task calls for. The channel registry lets `disconnected()`
//! (wired through `ClientHandler`, kept on the struct so it can be
//! consulted, but the actual teardown broadcast happens here since
//! `Handler` only gets `&mut self`, not the registry) force every
//! outstanding waiter to observe a fault instead of hanging forever.
//!
//! Connection setup (TCP dial, handshake, auth, ProxyJump chaining) is
//! adapted from `shelldeck-ssh::client::SshClient`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use russh::client;
use russh_keys::key::KeyPair;
use tokio::sync::Mutex as AsyncMutex;

use crate::channel::{ChannelRegistry, ChannelState, ChannelWrapper};
use crate::error::Error;
use crate::handler::ClientHandler;
use crate::known_hosts::KnownHosts;

/// How to reach a host and authenticate once there.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Explicit private key path. When unset, the default `~/.ssh/id_*`
    /// probe order from `shelldeck-ssh::client::SshClient::authenticate` is
    /// used instead.
    pub identity_file: Option<PathBuf>,
    pub known_hosts: KnownHosts,
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    /// `user@host:port` (or a comma-separated chain, of which only the
    /// first hop is honored — see `parse_jump_spec`), mirroring OpenSSH's
    /// `ProxyJump` option.
    pub proxy_jump: Option<String>,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            identity_file: None,
            known_hosts: KnownHosts::default(),
            connect_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(15),
            proxy_jump: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn known_hosts(mut self, policy: KnownHosts) -> Self {
        self.known_hosts = policy;
        self
    }

    pub fn proxy_jump(mut self, spec: impl Into<String>) -> Self {
        self.proxy_jump = Some(spec.into());
        self
    }
}

/// `check_server_key` reports a host-key mismatch by returning
/// `Err(Error::HostKeyMismatch{..}.into())` through the handler's
/// `anyhow::Error` associated error type; `client::connect`/`connect_stream`
/// surface that same value as their own error. Recover the concrete variant
/// before falling back to the generic `Connect` wrapping, so a mismatch
/// stays distinguishable from an ordinary handshake failure.
fn classify_connect_error(e: anyhow::Error, host: &str, port: u16) -> Error {
    match e.downcast::<Error>() {
        Ok(err @ Error::HostKeyMismatch { .. }) => err,
        Ok(other) => Error::Connect {
            host: host.to_string(),
            port,
            source: Arc::new(anyhow::anyhow!(other)),
        },
        Err(e) => Error::Connect {
            host: host.to_string(),
            port,
            source: Arc::new(e),
        },
    }
}

fn russh_config(options: &ConnectOptions) -> Arc<client::Config> {
    Arc::new(client::Config {
        inactivity_timeout: Some(options.connect_timeout),
        keepalive_interval: Some(options.keepalive_interval),
        keepalive_max: 3,
        ..Default::default()
    })
}

/// A live, authenticated multiplexed connection. All channel-opening
/// operations (`command.rs`'s open-with-retry driver) go through
/// `open_channel`, which registers the new channel's state before handing
/// back the raw `russh::Channel` for the pump to take ownership of.
pub struct Session {
    handle: Arc<AsyncMutex<client::Handle<ClientHandler>>>,
    registry: ChannelRegistry,
    host: String,
    port: u16,
    closed: Arc<std::sync::atomic::AtomicBool>,
    /// Kept alive only to hold the jump host's connection open for the
    /// lifetime of the tunnel it carries; never otherwise touched.
    _jump: Option<Box<Session>>,
}

impl Session {
    /// Connect and authenticate, following `options.proxy_jump` if set.
    pub async fn connect(options: &ConnectOptions) -> crate::Result<Self> {
        match options.proxy_jump.as_deref() {
            Some(spec) if !spec.trim().is_empty() && !spec.trim().eq_ignore_ascii_case("none") => {
                let first_hop = spec.split(',').next().unwrap_or(spec).trim();
                Self::connect_via_jump_host(first_hop, options).await
            }
            _ => Self::connect_direct(options).await,
        }
    }

    async fn connect_direct(options: &ConnectOptions) -> crate::Result<Self> {
        let config = russh_config(options);
        let registry = ChannelRegistry::default_registry();
        let handler = ClientHandler::new(
            options.host.clone(),
            options.port,
            options.known_hosts,
            registry.clone(),
        );
        let addr = format!("{}:{}", options.host, options.port);

        tracing::info!("connecting to {addr}");
        let mut handle = client::connect(config, addr.as_str(), handler)
            .await
            .map_err(|e| classify_connect_error(e, &options.host, options.port))?;

        authenticate(&mut handle, options).await?;

        Ok(Self {
            handle: Arc::new(AsyncMutex::new(handle)),
            registry,
            host: options.host.clone(),
            port: options.port,
            closed: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            _jump: None,
        })
    }

    async fn connect_via_jump_host(jump_spec: &str, target: &ConnectOptions) -> crate::Result<Self> {
        let jump_options = parse_jump_spec(jump_spec)?;

        tracing::info!(
            "connecting to jump host {}@{}:{}",
            jump_options.user,
            jump_options.host,
            jump_options.port
        );
        let jump_session = Box::new(Self::connect_direct(&jump_options).await.map_err(|e| {
            Error::Connect {
                host: jump_options.host.clone(),
                port: jump_options.port,
                source: Arc::new(anyhow::anyhow!("jump host '{jump_spec}' unreachable: {e}")),
            }
        })?);

        let channel = {
            let jump_handle = jump_session.handle.lock().await;
            jump_handle
                .channel_open_direct_tcpip(&target.host, target.port as u32, "127.0.0.1", 0)
                .await
                .map_err(|e| Error::Connect {
                    host: target.host.clone(),
                    port: target.port,
                    source: Arc::new(anyhow::anyhow!("direct-tcpip via jump host failed: {e}")),
                })?
        };
        let channel_stream = channel.into_stream();

        let config = russh_config(target);
        let registry = ChannelRegistry::default_registry();
        let handler = ClientHandler::new(
            target.host.clone(),
            target.port,
            target.known_hosts,
            registry.clone(),
        );

        tracing::info!("handshaking with {}:{} over jump channel", target.host, target.port);
        let mut handle = client::connect_stream(config, channel_stream, handler)
            .await
            .map_err(|e| classify_connect_error(e, &target.host, target.port))?;

        authenticate(&mut handle, target).await?;

        Ok(Self {
            handle: Arc::new(AsyncMutex::new(handle)),
            registry,
            host: target.host.clone(),
            port: target.port,
            closed: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            _jump: Some(jump_session),
        })
    }

    /// Open a fresh channel and register its state, leaving the pump task to
    /// be spawned by the caller once it knows whether a PTY/exec/shell
    /// request is about to follow. Used by `command.rs`'s open-with-retry
    /// driver.
    pub(crate) async fn open_channel(
        &self,
    ) -> crate::Result<(russh::Channel<client::Msg>, ChannelWrapper)> {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::SessionClosed);
        }
        let channel = {
            let handle = self.handle.lock().await;
            handle
                .channel_open_session()
                .await
                .map_err(|e| Error::ChannelOpenFailed {
                    code: 0,
                    reason: e.to_string(),
                })?
        };
        let state = ChannelState::new();
        self.registry.insert(channel.id(), state.clone()).await;
        // `channel_open_session()` only returns once the server has
        // confirmed or refused the channel, so the open condition is
        // already decided by the time we get here.
        state.signal_open();
        let wrapper = ChannelWrapper::new(channel.id(), state);
        Ok((channel, wrapper))
    }

    pub(crate) fn registry(&self) -> ChannelRegistry {
        self.registry.clone()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Disconnect gracefully. Outstanding waiters still observe the
    /// transport fault broadcast from `ClientHandler::disconnected`, driven
    /// by `russh`'s own background task noticing the socket close — this
    /// method just asks the server nicely first.
    pub async fn disconnect(&self) -> crate::Result<()> {
        let handle = self.handle.lock().await;
        handle
            .disconnect(russh::Disconnect::ByApplication, "ssh-open3 disconnect", "en")
            .await?;
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }
}

/// `user@host:port` (optionally `ssh://`-prefixed), as accepted by
/// OpenSSH's `ProxyJump`. Adapted from
/// `shelldeck-ssh::client::SshClient::parse_jump_spec`.
fn parse_jump_spec(spec: &str) -> crate::Result<ConnectOptions> {
    let spec = spec.trim();
    let spec = spec.strip_prefix("ssh://").unwrap_or(spec);

    let (user, host_port) = match spec.find('@') {
        Some(at) => (spec[..at].to_string(), &spec[at + 1..]),
        None => {
            let user = std::env::var("USER")
                .or_else(|_| std::env::var("LOGNAME"))
                .unwrap_or_else(|_| "root".to_string());
            (user, spec)
        }
    };

    let (host, port) = match host_port.rfind(':') {
        Some(colon) => match host_port[colon + 1..].parse::<u16>() {
            Ok(port) => (host_port[..colon].to_string(), port),
            Err(_) => (host_port.to_string(), 22),
        },
        None => (host_port.to_string(), 22),
    };

    if host.is_empty() {
        return Err(Error::Connect {
            host: host_port.to_string(),
            port: 22,
            source: Arc::new(anyhow::anyhow!("invalid jump host specifier: empty hostname in '{spec}'")),
        });
    }

    Ok(ConnectOptions::new(host, user).port(port))
}

/// Explicit key first, then the default `~/.ssh/id_{ed25519,rsa,ecdsa}`
/// probe order, then give up — password auth is left to the caller's own
/// `ssh-agent`/keyring integration rather than plumbed through here.
async fn authenticate(
    handle: &mut client::Handle<ClientHandler>,
    options: &ConnectOptions,
) -> crate::Result<()> {
    if let Some(ref key_path) = options.identity_file {
        if auth_with_key(handle, &options.user, key_path).await? {
            return Ok(());
        }
    } else {
        let home = std::env::var("HOME").unwrap_or_default();
        for candidate in ["id_ed25519", "id_rsa", "id_ecdsa"] {
            let path = PathBuf::from(&home).join(".ssh").join(candidate);
            if path.exists() && auth_with_key(handle, &options.user, &path).await? {
                return Ok(());
            }
        }
    }

    Err(Error::AuthFailed {
        user: options.user.clone(),
        host: options.host.clone(),
        reason: "no usable key found".to_string(),
    })
}

async fn auth_with_key(
    handle: &mut client::Handle<ClientHandler>,
    user: &str,
    key_path: &Path,
) -> crate::Result<bool> {
    let key_pair: KeyPair = match russh_keys::load_secret_key(key_path, None) {
        Ok(kp) => kp,
        Err(e) => {
            tracing::debug!("failed to load key {}: {e}", key_path.display());
            return Ok(false);
        }
    };

    let accepted = handle
        .authenticate_publickey(user, Arc::new(key_pair))
        .await
        .map_err(|e| Error::AuthFailed {
            user: user.to_string(),
            host: String::new(),
            reason: e.to_string(),
        })?;

    if accepted {
        tracing::info!("authenticated with key {}", key_path.display());
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_jump_spec_host_only() {
        let opts = parse_jump_spec("bastion.example.com").unwrap();
        assert_eq!(opts.host, "bastion.example.com");
        assert_eq!(opts.port, 22);
    }

    #[test]
    fn parse_jump_spec_user_host_port() {
        let opts = parse_jump_spec("admin@bastion.example.com:2222").unwrap();
        assert_eq!(opts.host, "bastion.example.com");
        assert_eq!(opts.user, "admin");
        assert_eq!(opts.port, 2222);
    }

    #[test]
    fn parse_jump_spec_ssh_uri() {
        let opts = parse_jump_spec("ssh://deploy@jump.internal:8022").unwrap();
        assert_eq!(opts.host, "jump.internal");
        assert_eq!(opts.user, "deploy");
        assert_eq!(opts.port, 8022);
    }

    #[test]
    fn parse_jump_spec_empty_hostname_fails() {
        assert!(parse_jump_spec("admin@").is_err());
    }
}
