//! Open-with-retry driver and `Command` builder.
//!
//! Assembles the remote command line, opens a channel with a bounded number
//! of retries on `ChannelOpenFailed`, requests a PTY and sets environment
//! variables if configured, execs the command, and installs the pump task.
//! Every exit path — success, retry exhaustion, or an error from `exec`
//! itself — leaves no channel registered without a pump watching it.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::ChannelWrapper;
use crate::error::Error;
use crate::escape::join_argv;
use crate::logger::{Logger, NullLogger};
use crate::pty::PtyRequest;
use crate::pump::{self, PumpEndpoints};
use crate::redirect::Redirects;
use crate::session::Session;
use crate::waiter::Waiter;

/// Default retry policy: 5 attempts, 1 second apart.
const DEFAULT_RETRIES: u32 = 5;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A remote command: argv, environment, redirections, PTY request, and the
/// channel-open retry policy. Built once, then opened via [`Command::open`].
#[derive(Clone)]
pub struct Command {
    argv: Vec<String>,
    env: Vec<(String, String)>,
    redirects: Redirects,
    pty: PtyRequest,
    retries: u32,
    retry_delay: Duration,
    logger: Arc<dyn Logger>,
}

impl Command {
    /// A command whose `argv` is taken verbatim if it's a single string, or
    /// shell-escaped and space-joined otherwise.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            redirects: Redirects::new(),
            pty: PtyRequest::default(),
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            logger: Arc::new(NullLogger),
        }
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    pub fn redirects(mut self, redirects: Redirects) -> Self {
        self.redirects = redirects;
        self
    }

    pub fn pty(mut self, pty: PtyRequest) -> Self {
        self.pty = pty;
        self
    }

    /// `(attempts, delay)` for the channel-open retry loop. `attempts = 0`
    /// disables retrying — the first failure is returned immediately.
    pub fn channel_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retries = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub(crate) fn logger_handle(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }

    /// The assembled command line: shell-joined argv plus redirections in
    /// declaration order.
    pub fn command_line(&self) -> String {
        let mut line = join_argv(self.argv.iter());
        line.push_str(&self.redirects.render());
        line
    }

    /// Open a channel, apply PTY/env/exec, and install the pump task that
    /// bridges `endpoints` to the channel. Retries channel-open failures up
    /// to `channel_retries()` times before giving up.
    ///
    /// On every exit path the channel is either fully wired to a pump or
    /// never registered at all — there is no state where a channel sits in
    /// the session's registry with nobody watching it.
    pub(crate) async fn open(
        &self,
        session: &Session,
        endpoints: PumpEndpoints,
    ) -> crate::Result<(ChannelWrapper, Waiter)> {
        let cmdline = self.command_line();
        self.logger.init(session.host(), &cmdline, self.pty.is_enabled());

        let mut attempt = 0u32;
        let (channel, wrapper) = loop {
            match session.open_channel().await {
                Ok(opened) => break opened,
                Err(e @ Error::ChannelOpenFailed { .. }) if attempt < self.retries => {
                    attempt += 1;
                    self.logger.warn(&format!(
                        "channel open attempt {attempt} failed ({e}); retrying in {:?}",
                        self.retry_delay
                    ));
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
                // Retries exhausted, or a non-retryable error: surface the
                // final `ChannelOpenFailed` as-is so callers matching on it
                // see exhaustion the same way they'd see a single failure.
                Err(e) => return Err(e),
            }
        };

        if let Err(e) = self.pty.request(&channel).await {
            self.logger.error(&format!("PTY request failed: {e}"));
            session.registry().remove(&wrapper.id).await;
            return Err(e);
        }

        for (name, value) in &self.env {
            if let Err(e) = channel.set_env(false, name, value).await {
                // Non-fatal: servers commonly reject AcceptEnv-filtered
                // names; the command still runs without them.
                self.logger.warn(&format!("environment variable {name} rejected: {e}"));
            }
        }

        if let Err(e) = channel.exec(true, cmdline.as_str()).await {
            session.registry().remove(&wrapper.id).await;
            return Err(e.into());
        }

        let state = wrapper.state.clone();
        pump::spawn_pump(channel, wrapper.id, state.clone(), endpoints, session.registry());
        let waiter = Waiter::spawn(state);

        Ok((wrapper, waiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_command_line_is_verbatim() {
        let cmd = Command::new(["echo hello"]);
        assert_eq!(cmd.command_line(), "echo hello");
    }

    #[test]
    fn multi_token_command_line_is_escaped() {
        let cmd = Command::new(["echo", "hello world"]);
        assert_eq!(cmd.command_line(), "echo 'hello world'");
    }

    #[test]
    fn redirects_are_appended_after_argv() {
        let cmd = Command::new(["cmd"]).redirects(
            Redirects::new().push(crate::redirect::RedirectKey::Out, "/tmp/out"),
        );
        assert_eq!(cmd.command_line(), "cmd >/tmp/out");
    }

    #[test]
    fn default_retry_policy_is_five_attempts_one_second() {
        let cmd = Command::new(["cmd"]);
        assert_eq!(cmd.retries, DEFAULT_RETRIES);
        assert_eq!(cmd.retry_delay, DEFAULT_RETRY_DELAY);
    }
}
