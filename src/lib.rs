//! `popen2`/`popen3`/`capture2`/`capture3`-style pipes over a multiplexed
//! SSH session.
//!
//! A [`Session`] owns one authenticated connection; [`Command`] describes a
//! remote command (argv, environment, redirections, PTY, channel-open retry
//! policy); [`popen2`]/[`popen2e`]/[`popen3`] open it and hand back live
//! pipe endpoints plus a [`Waiter`], and [`capture2`]/[`capture2e`]/
//! [`capture3`] additionally drive those pipes to completion. Connection
//! setup, shell-quoting, and logging are carried as supporting modules
//! rather than folded into the core channel/waiter machinery.

mod channel;
mod command;
mod error;
mod escape;
mod handler;
mod known_hosts;
mod logger;
mod pipe;
mod popen;
mod pty;
mod pump;
mod redirect;
mod session;
mod signal;
mod status;
mod waiter;

pub use channel::ChannelWrapper;
pub use command::Command;
pub use error::{Error, Result};
pub use known_hosts::KnownHosts;
pub use logger::{Logger, NullLogger, TracingLogger};
pub use popen::{capture2, capture2e, capture3, popen2, popen2e, popen3, RemoteProcess};
pub use pty::{PtyDimensions, PtyMode, PtyRequest};
pub use redirect::{RedirectKey, RedirectTarget, Redirects};
pub use session::{ConnectOptions, Session};
pub use status::ExitStatus;
pub use waiter::Waiter;
