//! Bytecode compiler.
//!
//! Transforms a resolved AST into a [`Program`] that can be executed by the
//! VM or encoded by the codec.
//!
//! # Module Structure
//!
//! - `bytecode`: Program, function and instruction definitions
//! - `codegen`: Code generation from a resolved AST

pub mod bytecode;
pub mod codegen;

pub use bytecode::{Capture, Constant, FreeVar, Funcode, Instruction, LineEntry, Named, OpCode, Program};
pub use codegen::{compile_file, Compiler};
