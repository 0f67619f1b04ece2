//! Lexical analysis (tokenization) for source code.
//!
//! The lexer transforms source text into a stream of tokens that can be
//! consumed by the parser. Indentation is significant: the scanner emits
//! `Indent`/`Outdent` tokens when the leading whitespace of a logical line
//! changes, and a `Newline` at the end of every non-blank logical line.
//!
//! ## Structure
//!
//! - `scanner.rs` - Main `Scanner` struct that produces tokens
//! - `token.rs` - `Token`, `TokenKind` and `Position` definitions
//!
//! ## Usage
//!
//! ```rust
//! use starlet_engine::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("x = 42\n");
//!
//! loop {
//!     let token = scanner.next_token().expect("valid input");
//!     if matches!(token.kind, TokenKind::Eof) {
//!         break;
//!     }
//!     println!("{:?}", token.kind);
//! }
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{IntLiteral, Position, Token, TokenKind};
