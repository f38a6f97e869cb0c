//! Shell-quoting helpers used to assemble the remote command line. Adapted
//! from the `openssh` crate's `escape` module, which itself is a fork of
//! the `shell-escape` crate's unix backend; we depend on `shell-escape`
//! directly rather than re-deriving the whitelist.

use std::borrow::Cow;

/// Shell-escape a single token for inclusion in a command line run through
/// the remote login shell.
pub(crate) fn escape(token: &str) -> Cow<'_, str> {
    shell_escape::escape(Cow::Borrowed(token))
}

/// Join argv tokens into one shell command line, escaping each token.
/// A single-token command is taken verbatim; multiple tokens are escaped
/// and space-joined.
pub(crate) fn join_argv<I, S>(mut tokens: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    let first = match tokens.next() {
        Some(t) => t,
        None => return String::new(),
    };

    let mut rest = tokens.peekable();
    if rest.peek().is_none() {
        return first.as_ref().to_string();
    }

    let mut out = escape(first.as_ref()).into_owned();
    for token in rest {
        out.push(' ');
        out.push_str(&escape(token.as_ref()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_token_is_verbatim() {
        assert_eq!(join_argv(["echo hello"].into_iter()), "echo hello");
    }

    #[test]
    fn multiple_tokens_are_escaped_and_joined() {
        let cmdline = join_argv(["echo", "hello world"].into_iter());
        assert_eq!(cmdline, "echo 'hello world'");
    }

    #[test]
    fn safe_tokens_are_not_quoted() {
        assert_eq!(escape("simple-token_1.2"), "simple-token_1.2");
    }
}
