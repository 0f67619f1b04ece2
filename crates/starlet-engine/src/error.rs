// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for compilation, decoding and evaluation.
//!
//! There are three classes, all returned as values:
//!
//! - [`StaticErrors`]: syntax and resolution failures, aggregated per file
//! - [`DecodeError`]: a compiled program could not be restored
//! - [`EvalError`]: execution failed; carries the unwound call stack

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::lexer::Position;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Any error the engine can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Syntax or resolution failure
    #[error("{0}")]
    Static(#[from] StaticErrors),

    /// A compiled program could not be decoded
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// Execution failed
    #[error("{0}")]
    Eval(#[from] EvalError),

    /// Reading a compiled program failed
    #[error("reading compiled module: {0}")]
    Io(#[from] std::io::Error),
}

/// A single positioned static error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticError {
    /// Where the error was detected
    pub pos: Position,
    /// What went wrong
    pub msg: String,
}

impl StaticError {
    /// Creates a new static error.
    pub fn new(pos: Position, msg: impl Into<String>) -> Self {
        Self {
            pos,
            msg: msg.into(),
        }
    }
}

/// All static errors found in one file, sorted by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticErrors {
    /// The file name
    pub path: String,
    /// The individual errors
    pub errors: Vec<StaticError>,
}

impl StaticErrors {
    /// Creates an aggregate from a list of errors.
    pub fn new(path: impl Into<String>, mut errors: Vec<StaticError>) -> Self {
        errors.sort_by_key(|e| e.pos);
        Self {
            path: path.into(),
            errors,
        }
    }

    /// Creates an aggregate holding one error.
    pub fn single(path: impl Into<String>, error: StaticError) -> Self {
        Self::new(path, vec![error])
    }
}

impl fmt::Display for StaticErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}:{}: {}", self.path, err.pos, err.msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for StaticErrors {}

/// Failure to restore a compiled program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input does not start with the magic prefix
    #[error("not a compiled module")]
    NotCompiled,

    /// The input was produced by a different format version
    #[error("incompatible compiled module version: got {found}, want {expected}")]
    Version {
        /// Version found in the input
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// The input ended early
    #[error("truncated compiled module")]
    Truncated,

    /// The input is structurally invalid
    #[error("corrupt compiled module: {0}")]
    Corrupt(String),
}

impl DecodeError {
    /// A short classification string for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::NotCompiled => "foreign",
            DecodeError::Version { .. } => "version",
            DecodeError::Truncated => "truncated",
            DecodeError::Corrupt(_) => "corrupt",
        }
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        DecodeError::Corrupt(msg.into())
    }
}

/// One entry of a call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Name of the function, `<toplevel>` for module code
    pub name: String,
    /// File the function was compiled from
    pub path: Arc<str>,
    /// Position of the active instruction
    pub pos: Position,
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: in {}", self.path, self.pos, self.name)
    }
}

/// A call stack, outermost frame first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallStack(pub Vec<CallFrame>);

impl CallStack {
    /// Returns the frames, outermost first.
    pub fn frames(&self) -> &[CallFrame] {
        &self.0
    }

    /// Returns the innermost frame.
    pub fn innermost(&self) -> Option<&CallFrame> {
        self.0.last()
    }

    /// Returns the number of frames.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Traceback (most recent call last):\n")?;
        for frame in &self.0 {
            writeln!(f, "  {}", frame)?;
        }
        Ok(())
    }
}

/// An error raised during execution, with the call stack at the point of
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    msg: String,
    call_stack: CallStack,
}

impl EvalError {
    /// Creates an error from a message and an outermost-first call stack.
    pub fn new(msg: impl Into<String>, call_stack: CallStack) -> Self {
        Self {
            msg: msg.into(),
            call_stack,
        }
    }

    /// The one-line error message.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// The call stack, outermost frame first.
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Renders the full traceback followed by the error message.
    pub fn backtrace(&self) -> String {
        format!("{}Error: {}", self.call_stack, self.msg)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for EvalError {}
