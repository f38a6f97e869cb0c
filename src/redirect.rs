//! Output redirection.
//!
//! A caller-supplied, ordered list of `(selector, target)` pairs appended to
//! the assembled command line as shell redirection syntax. Declaration
//! order is significant and preserved verbatim.

use std::borrow::Cow;

use crate::escape::escape;

/// The stream a redirection applies to, or a literal operator string for
/// anything the `{in, out, err}` shorthand doesn't cover.
///
/// Any key outside `{in, out, err}` is treated as a literal shell
/// redirection operator, by design — not a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectKey {
    In,
    Out,
    Err,
    /// Used verbatim as the shell operator, e.g. `">>"`.
    Literal(String),
}

impl RedirectKey {
    fn operator(&self) -> Cow<'_, str> {
        match self {
            RedirectKey::In => Cow::Borrowed("<"),
            RedirectKey::Out => Cow::Borrowed(">"),
            RedirectKey::Err => Cow::Borrowed("2>"),
            RedirectKey::Literal(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl From<&str> for RedirectKey {
    fn from(s: &str) -> Self {
        match s {
            "in" => RedirectKey::In,
            "out" => RedirectKey::Out,
            "err" => RedirectKey::Err,
            other => RedirectKey::Literal(other.to_string()),
        }
    }
}

/// The destination of a redirection: a duplicated file descriptor number or
/// a shell-escaped path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    Fd(u32),
    Path(String),
}

impl From<u32> for RedirectTarget {
    fn from(fd: u32) -> Self {
        RedirectTarget::Fd(fd)
    }
}

impl From<&str> for RedirectTarget {
    fn from(path: &str) -> Self {
        RedirectTarget::Path(path.to_string())
    }
}

impl RedirectTarget {
    fn render(&self) -> Cow<'_, str> {
        match self {
            RedirectTarget::Fd(n) => Cow::Owned(format!("&{n}")),
            RedirectTarget::Path(p) => escape(p),
        }
    }
}

/// An ordered list of redirections, rendered as a command-line suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirects(Vec<(RedirectKey, RedirectTarget)>);

impl Redirects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one redirection, preserving call order.
    pub fn push(mut self, key: impl Into<RedirectKey>, target: impl Into<RedirectTarget>) -> Self {
        self.0.push((key.into(), target.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as the literal suffix to append to the command line, e.g.
    /// ` >>/tmp/log 2>&1` for `[(">>", "/tmp/log"), (err, 1)]`.
    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for (key, target) in &self.0 {
            out.push(' ');
            out.push_str(&key.operator());
            out.push_str(&target.render());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_key_and_fd_target() {
        let redirects = Redirects::new()
            .push(RedirectKey::Literal(">>".into()), RedirectTarget::Path("/tmp/log".into()))
            .push(RedirectKey::Err, RedirectTarget::Fd(1));
        assert_eq!(redirects.render(), " >>/tmp/log 2>&1");
    }

    #[test]
    fn in_out_err_shorthand() {
        let redirects = Redirects::new()
            .push(RedirectKey::In, RedirectTarget::Path("/tmp/in".into()))
            .push(RedirectKey::Out, RedirectTarget::Path("/tmp/out".into()));
        assert_eq!(redirects.render(), " </tmp/in >/tmp/out");
    }

    #[test]
    fn paths_with_spaces_are_escaped() {
        let redirects = Redirects::new().push(RedirectKey::Out, RedirectTarget::Path("/tmp/my log".into()));
        assert_eq!(redirects.render(), " >'/tmp/my log'");
    }
}
