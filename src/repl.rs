//! Line-oriented command loop for the demonstration executable.
//!
//! Lines starting with `set` adjust the session (`set precision N`,
//! `set timeout N`, `set division limit N`); everything else is parsed as
//! an expression and rendered at the configured digit count, with the
//! evaluation running on a worker thread so the timeout can cancel it.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::approx::Prec;
use crate::concurrency::CancelToken;
use crate::error::{EvalError, ParseError};
use crate::parser::parse_expression;
use crate::settings::EvalSettings;

/// Fraction digits shown until `set precision` changes it.
pub const DEFAULT_DIGITS: u32 = 64;

/// `set division limit` never loosens past this.
const DIVISION_LIMIT_CEILING: Prec = -1024;

/// Extra grace the watchdog allows the worker beyond the configured
/// timeout before tripping the token itself.
const WATCHDOG_GRACE_MS: u64 = 50;

/// Errors surfaced to the user, qualified by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplError {
    Syntax(ParseError),
    Command(String),
    Eval(EvalError),
}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(error) => write!(f, "Syntax error: {error}"),
            Self::Command(message) => write!(f, "Syntax error: {message}"),
            Self::Eval(EvalError::Cancelled) => write!(f, "Timeout.."),
            Self::Eval(EvalError::DivideByZero) => write!(f, "DivideByZero"),
            Self::Eval(EvalError::AsinOutOfRange) => {
                write!(f, "Overflow: {}", EvalError::AsinOutOfRange)
            }
            Self::Eval(EvalError::PrecisionOverflow) => {
                write!(f, "Overflow: {}", EvalError::PrecisionOverflow)
            }
            Self::Eval(error) => write!(f, "Arithmetic error: {error}"),
        }
    }
}

impl std::error::Error for ReplError {}

impl From<ParseError> for ReplError {
    fn from(error: ParseError) -> Self {
        Self::Syntax(error)
    }
}

impl From<EvalError> for ReplError {
    fn from(error: EvalError) -> Self {
        Self::Eval(error)
    }
}

pub struct Repl {
    digits: u32,
    timeout_ms: i64,
    settings: EvalSettings,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            digits: DEFAULT_DIGITS,
            timeout_ms: -1,
            settings: EvalSettings::new(),
        }
    }

    /// Reads lines until EOF, writing each result (or error) with a
    /// two-space indent. Returns the I/O error if reading or writing fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, output: &mut W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.handle(line) {
                Ok(Some(result)) => writeln!(output, "  {result}")?,
                Ok(None) => {}
                Err(error) => writeln!(output, "  {error}")?,
            }
            output.flush()?;
        }
        Ok(())
    }

    /// Handles one line: `Ok(None)` for settings commands, `Ok(Some(text))`
    /// for rendered expressions.
    pub fn handle(&mut self, line: &str) -> Result<Option<String>, ReplError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.first() == Some(&"set") {
            self.command(&words)?;
            return Ok(None);
        }
        self.evaluate(line).map(Some)
    }

    fn command(&mut self, words: &[&str]) -> Result<(), ReplError> {
        match words {
            ["set", "precision", digits] => {
                let digits: u32 = digits
                    .parse()
                    .map_err(|_| ReplError::Command("precision expects a non-negative integer".into()))?;
                self.digits = digits;
                Ok(())
            }
            ["set", "timeout", millis] => {
                let millis: i64 = millis
                    .parse()
                    .map_err(|_| ReplError::Command("timeout expects milliseconds or -1".into()))?;
                self.timeout_ms = millis;
                Ok(())
            }
            ["set", "division", "limit", limit] => {
                let limit: Prec = limit
                    .parse()
                    .map_err(|_| ReplError::Command("division limit expects an integer".into()))?;
                self.settings = self
                    .settings
                    .with_division_limit(limit.min(DIVISION_LIMIT_CEILING));
                Ok(())
            }
            _ => Err(ReplError::Command(format!(
                "unknown set command: {}",
                words.join(" ")
            ))),
        }
    }

    fn evaluate(&self, line: &str) -> Result<String, ReplError> {
        let value = parse_expression(line, self.settings.factory())?;
        let token = if self.timeout_ms >= 0 {
            Arc::new(CancelToken::with_timeout(Duration::from_millis(
                self.timeout_ms as u64,
            )))
        } else {
            // Negative timeouts mean "never cancel on time".
            Arc::new(CancelToken::unbounded())
        };
        let cx = self.settings.with_token(Arc::clone(&token));
        let digits = self.digits;

        let (sender, receiver) = bounded(1);
        let rendered = std::thread::scope(|scope| {
            scope.spawn(move || {
                let _ = sender.send(value.to_decimal(digits, &cx));
            });
            if self.timeout_ms >= 0 {
                let wait = Duration::from_millis(self.timeout_ms as u64 + WATCHDOG_GRACE_MS);
                match receiver.recv_timeout(wait) {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => {
                        token.stop();
                        receiver.recv().unwrap_or(Err(EvalError::Cancelled))
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        Err(EvalError::Internal("evaluation worker exited"))
                    }
                }
            } else {
                receiver
                    .recv()
                    .unwrap_or(Err(EvalError::Internal("evaluation worker exited")))
            }
        });
        rendered.map_err(ReplError::from)
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;

    fn run_session(lines: &str) -> String {
        let mut repl = Repl::new();
        let mut output = Vec::new();
        repl.run(lines.as_bytes(), &mut output)
            .expect("session should run");
        String::from_utf8(output).expect("output should be utf-8")
    }

    #[test]
    fn expressions_print_with_indent() {
        let output = run_session("set precision 2\n1+1\n");
        assert_eq!(output, "  2.00\n");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let output = run_session("\n\nset precision 0\n2*3\n\n");
        assert_eq!(output, "  6\n");
    }

    #[test]
    fn syntax_errors_are_reported() {
        let output = run_session("set precision 2\n1+\n");
        assert!(output.contains("Syntax error"), "got {output:?}");
    }

    #[test]
    fn unknown_set_commands_are_syntax_errors() {
        let output = run_session("set frobnication 9\n");
        assert!(output.contains("Syntax error"), "got {output:?}");
    }

    #[test]
    fn division_by_zero_is_reported() {
        let output = run_session("set precision 4\n1/0\n");
        assert!(output.contains("DivideByZero"), "got {output:?}");
    }

    #[test]
    fn division_limit_is_clamped() {
        // A limit of -3 would declare 2^-10 zero, but the clamp keeps the
        // effective limit at -1024, so the division still succeeds.
        let output = run_session("set division limit -3\nset precision 4\n1/(1/1024)\n");
        assert_eq!(output, "  1024.0000\n");
    }

    #[test]
    fn division_below_limit_fails() {
        let output = run_session("set precision 4\n1/1.0E-10000\n");
        assert!(output.contains("DivideByZero"), "got {output:?}");
    }

    #[test]
    fn timeout_cancels_and_session_stays_usable() {
        let output = run_session(
            "set precision 10000\nset timeout 50\nexp(100000)\nset timeout -1\nset precision 2\n1+1\n",
        );
        assert!(output.contains("Timeout.."), "got {output:?}");
        assert!(output.ends_with("  2.00\n"), "got {output:?}");
    }

    #[test]
    fn asin_overflow_is_reported() {
        let output = run_session("set precision 4\nasin(2)\n");
        assert!(output.contains("Overflow"), "got {output:?}");
    }
}
