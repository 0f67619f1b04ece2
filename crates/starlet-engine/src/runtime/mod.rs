//! Runtime values.
//!
//! ## Structure
//!
//! - `value` - the [`Value`] enum, lists and formatting
//! - `dict` - insertion-ordered dictionaries and key hashing
//! - `function` - closures, builtins, cells and module state
//! - `ops` - operator dispatch, comparison and indexing

pub mod dict;
pub mod function;
pub mod ops;
pub mod value;

pub use dict::Dict;
pub use function::{Arguments, Builtin, Cell, Function, Module, NativeFunction};
pub use value::{List, Value};
