//! Dialect options.
//!
//! Options are an explicit immutable value threaded through the parser,
//! resolver, compiler and codec. Every flag defaults to `false`, which is the
//! permissive core dialect.

use serde::{Deserialize, Serialize};

/// Flags selecting the language dialect a file is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Reject implicit tuples on the right of single-target assignments and
    /// require every reachable `return` of a function to yield the same number
    /// of values.
    pub strict_multi_value_return: bool,
    /// Permit `while` loops.
    pub while_loops: bool,
    /// Permit `if`, `for` and `while` at toplevel.
    pub top_level_control: bool,
    /// Permit rebinding a global variable.
    pub global_reassign: bool,
    /// Permit recursive function calls.
    pub recursion: bool,
}

const STRICT_MULTI_VALUE_RETURN: u32 = 1 << 0;
const WHILE_LOOPS: u32 = 1 << 1;
const TOP_LEVEL_CONTROL: u32 = 1 << 2;
const GLOBAL_REASSIGN: u32 = 1 << 3;
const RECURSION: u32 = 1 << 4;
const ALL: u32 = STRICT_MULTI_VALUE_RETURN | WHILE_LOOPS | TOP_LEVEL_CONTROL | GLOBAL_REASSIGN | RECURSION;

impl FileOptions {
    /// Options with every relaxation enabled and strict checks disabled.
    pub fn permissive() -> Self {
        Self {
            strict_multi_value_return: false,
            while_loops: true,
            top_level_control: true,
            global_reassign: true,
            recursion: true,
        }
    }

    /// Encodes the options as the bitmask stored in compiled programs.
    pub fn to_bits(self) -> u32 {
        let mut bits = 0;
        if self.strict_multi_value_return {
            bits |= STRICT_MULTI_VALUE_RETURN;
        }
        if self.while_loops {
            bits |= WHILE_LOOPS;
        }
        if self.top_level_control {
            bits |= TOP_LEVEL_CONTROL;
        }
        if self.global_reassign {
            bits |= GLOBAL_REASSIGN;
        }
        if self.recursion {
            bits |= RECURSION;
        }
        bits
    }

    /// Decodes a bitmask, rejecting unknown bits.
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !ALL != 0 {
            return None;
        }
        Some(Self {
            strict_multi_value_return: bits & STRICT_MULTI_VALUE_RETURN != 0,
            while_loops: bits & WHILE_LOOPS != 0,
            top_level_control: bits & TOP_LEVEL_CONTROL != 0,
            global_reassign: bits & GLOBAL_REASSIGN != 0,
            recursion: bits & RECURSION != 0,
        })
    }
}
