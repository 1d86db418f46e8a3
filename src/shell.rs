//! Shell quoting and stderr-silencing wrappers for subprocess servers.
//!
//! These helpers keep quoting consistent between descriptor construction and
//! tests so a wrapped command line always round-trips through the shell with
//! the original argument boundaries intact.

/// Escapes a value for safe inclusion in a POSIX shell command.
///
/// Uses single-quote wrapping and the standard `'\''` sequence for embedded
/// quotes.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// Quotes a value for `cmd.exe`.
///
/// Values without whitespace or quotes are emitted verbatim.
#[must_use]
pub fn cmd_escape(value: &str) -> String {
    let needs_quotes =
        value.is_empty() || value.chars().any(|ch| ch.is_whitespace() || ch == '"');
    if !needs_quotes {
        return value.to_owned();
    }
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Shell used to host an output-suppressed subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellFlavor {
    /// `sh -c` with `/dev/null` as the null sink.
    Posix,
    /// `cmd /C` with `NUL` as the null sink.
    WindowsCmd,
}

impl ShellFlavor {
    /// Returns the flavour for the platform this crate was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::WindowsCmd
        } else {
            Self::Posix
        }
    }

    /// Returns the platform null sink.
    #[must_use]
    pub const fn null_sink(self) -> &'static str {
        match self {
            Self::Posix => "/dev/null",
            Self::WindowsCmd => "NUL",
        }
    }

    /// Returns the shell executable.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Posix => "sh",
            Self::WindowsCmd => "cmd",
        }
    }

    const fn inline_flag(self) -> &'static str {
        match self {
            Self::Posix => "-c",
            Self::WindowsCmd => "/C",
        }
    }

    fn quote(self, value: &str) -> String {
        match self {
            Self::Posix => shell_escape(value),
            Self::WindowsCmd => cmd_escape(value),
        }
    }

    /// Wraps `command` and `args` as an inner shell invocation whose standard
    /// error is redirected to the null sink.
    ///
    /// Standard output is left attached: for STDIO servers it carries the
    /// tool protocol.
    #[must_use]
    pub fn wrap_silencing_stderr(self, command: &str, args: &[String]) -> (String, Vec<String>) {
        let mut parts = Vec::with_capacity(args.len() + 1);
        parts.push(self.quote(command));
        parts.extend(args.iter().map(|arg| self.quote(arg)));
        let joined = parts.join(" ");

        let inner = match self {
            Self::Posix => format!("exec {joined} 2>{}", self.null_sink()),
            Self::WindowsCmd => format!("{joined} 2>{}", self.null_sink()),
        };

        (
            self.program().to_owned(),
            vec![self.inline_flag().to_owned(), inner],
        )
    }
}
