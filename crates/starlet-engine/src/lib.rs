// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # starlet-engine
//!
//! The compile, serialize and execute core of the starlet configuration
//! language, a small deterministic Python dialect for sandboxed scripts.
//!
//! ## Overview
//!
//! This crate provides:
//! - Scanner and parser producing a positioned AST
//! - A resolver that binds every name and enforces the dialect's static rules
//! - A compiler from the resolved AST to stack bytecode
//! - A versioned binary codec for compiled programs
//! - A virtual machine with cooperative cancellation and a step budget
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use starlet_engine::{StringDict, Thread, Value};
//!
//! let src = "def double(x):\n    return x * 2\n\ny = double(n)\n";
//! let (_, program) = starlet_engine::source_program("double.star", src, &|name| name == "n")
//!     .expect("Should compile");
//! let program = Arc::new(program);
//!
//! let mut predeclared = StringDict::new();
//! predeclared.insert("n".to_string(), Value::Int(21));
//! let globals = program
//!     .init(&mut Thread::new("main"), &predeclared)
//!     .expect("Should run");
//! assert_eq!(globals["y"], Value::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod codec;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod resolve;
pub mod runtime;
pub mod vm;

use std::io::Read;

use tracing::debug;

pub use ast::File;
pub use compiler::Program;
pub use error::{CallFrame, CallStack, DecodeError, Error, EvalError, Result, StaticError, StaticErrors};
pub use options::FileOptions;
pub use runtime::{Arguments, Value};
pub use vm::{CancelHandle, StringDict, Thread};

/// Parses, resolves and compiles `src` in the default dialect.
///
/// `is_predeclared` reports the names the host will bind when the program
/// is initialized.
pub fn source_program(filename: &str, src: &str, is_predeclared: &dyn Fn(&str) -> bool) -> Result<(File, Program)> {
    source_program_options(FileOptions::default(), filename, src, is_predeclared)
}

/// Parses, resolves and compiles `src` in the dialect selected by `options`.
pub fn source_program_options(
    options: FileOptions,
    filename: &str,
    src: &str,
    is_predeclared: &dyn Fn(&str) -> bool,
) -> Result<(File, Program)> {
    let mut file = parser::Parser::parse_file(filename, src, options)?;
    resolve::resolve_file(&mut file, is_predeclared, &builtins::is_universal)?;
    let program = compiler::compile_file(&file)?;
    Ok((file, program))
}

/// Compiles a file that has already been resolved.
pub fn file_program(file: &File) -> Result<Program> {
    Ok(compiler::compile_file(file)?)
}

/// Reads and decodes a compiled program.
pub fn compiled_program<R: Read>(mut reader: R) -> Result<Program> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    debug!(bytes = data.len(), "read compiled program");
    Ok(Program::decode(&data)?)
}
