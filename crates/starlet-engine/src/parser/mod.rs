//! Parser for script source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST). The
//! parser stops at the first syntax error; resolution errors are collected
//! later by the resolver.
//!
//! ## Structure
//!
//! - `parser` - Main recursive descent parser implementation
//!
//! ## Documentation Submodules
//!
//! - `statements` - Statement grammar (def, if, for, while, assignments)
//! - `expressions` - Expression grammar (operators, literals, calls)
//!
//! ## Usage
//!
//! ```rust
//! use starlet_engine::options::FileOptions;
//! use starlet_engine::parser::Parser;
//!
//! let file = Parser::parse_file("a.star", "x = 1 + 2\n", FileOptions::default())
//!     .expect("Should parse");
//! assert_eq!(file.stmts.len(), 1);
//! ```

mod parser;

// Documentation and test submodules
pub mod expressions;
pub mod statements;

pub use parser::{MAX_NESTING, Parser};
