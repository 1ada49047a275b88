//! Pattern engine seam
//!
//! The audio engine sits strictly behind this narrow capability interface.
//! Nothing above it (protocol handlers, version store, CLI) may depend on
//! engine internals; pattern source text is an opaque blob everywhere else.
//!
//! Evaluating source that contains output-producing statements is what starts
//! audio — there is no separate "start playing" protocol step. Re-evaluating
//! replaces the running pattern seamlessly, which is what makes find-replace
//! updates and version rollback audible without a gap.

use std::sync::atomic::{AtomicBool, Ordering};
use tapedeck_common::{Error, Result};
use tracing::{debug, info};

/// Outcome of a syntax check, with the location of the first error if any
#[derive(Debug, Clone)]
pub struct Validation {
    pub valid: bool,
    pub message: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl Validation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: None,
            line: None,
            column: None,
        }
    }

    fn err(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            line: Some(line),
            column: Some(column),
        }
    }
}

/// Capability interface to the audio engine
pub trait PatternEngine: Send + Sync {
    /// Syntax-check code without touching playback
    fn validate(&self, code: &str) -> Validation;

    /// Evaluate code against the live engine (starts/replaces audio output)
    fn evaluate(&self, code: &str) -> Result<()>;

    /// Silence the engine; safe to call when nothing is playing
    fn stop(&self);

    /// Suspend audio output, keeping the evaluated pattern loaded
    fn pause(&self);

    /// Resume audio output after a pause
    fn start(&self);
}

/// Engine used when no audio backend is wired in
///
/// Accepts any pattern whose delimiters balance, logs evaluations, and tracks
/// a running flag. Keeps the daemon fully exercisable (and testable) on
/// machines without an audio device.
pub struct NullEngine {
    running: AtomicBool,
}

impl NullEngine {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternEngine for NullEngine {
    fn validate(&self, code: &str) -> Validation {
        check_delimiters(code)
    }

    fn evaluate(&self, code: &str) -> Result<()> {
        let validation = self.validate(code);
        if !validation.valid {
            let message = validation
                .message
                .unwrap_or_else(|| "invalid pattern".to_string());
            return Err(Error::EvaluationError(match (validation.line, validation.column) {
                (Some(line), Some(column)) => format!("{message} at {line}:{column}"),
                _ => message,
            }));
        }
        self.running.store(true, Ordering::SeqCst);
        info!(bytes = code.len(), "Evaluated pattern");
        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Engine stopped");
        } else {
            debug!("Engine stop (already silent)");
        }
    }

    fn pause(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Engine paused");
    }

    fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!("Engine started");
    }
}

/// Check bracket/quote balance, reporting the first offending position
/// (1-based line and column)
fn check_delimiters(code: &str) -> Validation {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();
    let mut in_string: Option<(char, usize, usize)> = None;
    let mut escaped = false;
    let mut line = 1;
    let mut column = 0;

    for c in code.chars() {
        if c == '\n' {
            line += 1;
            column = 0;
            escaped = false;
            continue;
        }
        column += 1;

        if let Some((quote, _, _)) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => in_string = Some((c, line, column)),
            '(' | '[' | '{' => stack.push((c, line, column)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _, _)) if open == expected => {}
                    Some((open, l, col)) => {
                        return Validation::err(
                            format!("mismatched '{c}'; '{open}' opened at {l}:{col}"),
                            line,
                            column,
                        )
                    }
                    None => return Validation::err(format!("unmatched '{c}'"), line, column),
                }
            }
            _ => {}
        }
    }

    if let Some((quote, l, col)) = in_string {
        return Validation::err(format!("unterminated {quote} string"), l, col);
    }
    if let Some((open, l, col)) = stack.pop() {
        return Validation::err(format!("unclosed '{open}'"), l, col);
    }
    Validation::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_code_validates() {
        let engine = NullEngine::new();
        assert!(engine.validate("s(\"bd sn\").fast(2)").valid);
        assert!(engine.validate("").valid);
        assert!(engine.validate("stack[ {a: '1'} ]").valid);
    }

    #[test]
    fn unclosed_bracket_reports_open_position() {
        let v = check_delimiters("note(\"c e g\"\n.slow(2)");
        assert!(!v.valid);
        assert_eq!(v.line, Some(1));
        assert_eq!(v.column, Some(5));
    }

    #[test]
    fn mismatched_close_reports_close_position() {
        let v = check_delimiters("s(\"bd\"]");
        assert!(!v.valid);
        assert_eq!(v.line, Some(1));
        assert_eq!(v.column, Some(7));
    }

    #[test]
    fn unterminated_string_reports_quote_position() {
        let v = check_delimiters("s(\"bd sn)");
        assert!(!v.valid);
        assert_eq!(v.line, Some(1));
        assert_eq!(v.column, Some(3));
    }

    #[test]
    fn escapes_inside_strings_are_skipped() {
        assert!(check_delimiters(r#"s("a \" ( b")"#).valid);
    }

    #[test]
    fn evaluate_flips_running_and_stop_clears_it() {
        let engine = NullEngine::new();
        assert!(!engine.is_running());
        engine.evaluate("tone(440)").unwrap();
        assert!(engine.is_running());
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn evaluate_rejects_invalid_pattern() {
        let engine = NullEngine::new();
        let err = engine.evaluate("tone(440").unwrap_err();
        assert!(matches!(err, Error::EvaluationError(_)));
        assert!(!engine.is_running());
    }
}
