//! Accumulated diagnostic text and the result type every pipeline stage returns.
//!
//! Stages never print and never let an error escape. Instead each returns an
//! [`Outcome`]: the typed result plus a [`Diagnostics`] buffer with everything worth showing
//! the user, i.e. trace lines, the captured output of child processes and the full text of
//! any error. The orchestrator merges these buffers across stages and prints them verbatim
//! only when a target fails.
//!
//! # Examples
//!
//! ```rust
//! use publicizer::{Diagnostics, Error, Outcome};
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.trace("Running program 'tool a b'...");
//! diagnostics.output("tool: no such input\n");
//!
//! let outcome: Outcome<()> = Outcome::failure(Error::ProgramNotFound("tool".into()), diagnostics);
//! assert!(!outcome.is_success());
//! assert_eq!(outcome.code(), -1);
//! assert!(outcome.diagnostics.to_string().contains("tool: no such input"));
//! ```

use std::{error::Error as StdError, fmt};

use crate::{Error, Result};

/// Exit code reported for any failure
pub const FAILURE: i32 = -1;

/// What kind of text a [`Diagnostic`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// A trace line describing what is being done
    Trace,
    /// Text captured from a child process, kept verbatim
    Output,
    /// The rendered text of an error
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Trace => write!(f, "TRACE"),
            DiagnosticSeverity::Output => write!(f, "OUTPUT"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single entry of a [`Diagnostics`] buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Kind of entry
    pub severity: DiagnosticSeverity,
    /// The text as it will be printed
    pub message: String,
}

/// An append-only buffer of diagnostic text.
///
/// Displaying the buffer prints every entry in order, each terminated by a newline unless
/// it already ends with one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: DiagnosticSeverity, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity,
            message: message.into(),
        });
    }

    /// Append a trace line.
    pub fn trace(&mut self, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Trace, message);
    }

    /// Append captured output verbatim. Empty text is ignored.
    pub fn output(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.push(DiagnosticSeverity::Output, text);
        }
    }

    /// Append the full text of `error`, including every error in its source chain.
    pub fn error(&mut self, error: &Error) {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str("\n  caused by: ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        self.push(DiagnosticSeverity::Error, message);
    }

    /// Move all entries of `other` to the end of this buffer.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if any error has been recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == DiagnosticSeverity::Error)
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            f.write_str(&entry.message)?;
            if !entry.message.ends_with('\n') {
                f.write_str("\n")?;
            }
        }

        Ok(())
    }
}

/// The result of one stage together with the diagnostics it produced.
#[derive(Debug)]
pub struct Outcome<T> {
    /// The typed result of the stage
    pub result: Result<T>,
    /// Everything the stage recorded, including the text of `result`'s error
    pub diagnostics: Diagnostics,
}

impl<T> Outcome<T> {
    /// A successful outcome.
    #[must_use]
    pub fn success(value: T, diagnostics: Diagnostics) -> Self {
        Outcome {
            result: Ok(value),
            diagnostics,
        }
    }

    /// A failed outcome; the error's text is appended to `diagnostics`.
    #[must_use]
    pub fn failure(error: Error, mut diagnostics: Diagnostics) -> Self {
        diagnostics.error(&error);
        Outcome {
            result: Err(error),
            diagnostics,
        }
    }

    /// Build an outcome from a result, recording the error text on failure.
    #[must_use]
    pub fn from_result(result: Result<T>, diagnostics: Diagnostics) -> Self {
        match result {
            Ok(value) => Self::success(value, diagnostics),
            Err(error) => Self::failure(error, diagnostics),
        }
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the process exit code for this outcome, `0` or [`FAILURE`].
    #[must_use]
    pub fn code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            FAILURE
        }
    }

    /// Split into result and diagnostics.
    pub fn into_parts(self) -> (Result<T>, Diagnostics) {
        (self.result, self.diagnostics)
    }
}

impl Outcome<i32> {
    /// Returns the exit code of a child process run, or [`FAILURE`] if it never produced one.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.result {
            Ok(code) => code,
            Err(_) => FAILURE,
        }
    }
}
