//! Bytecode definitions.
//!
//! A [`Program`] owns a table of [`Funcode`]s (index 0 is the toplevel
//! function) and a constant pool shared by all of them. Each instruction is
//! an [`OpCode`] with a `u32` argument, which is zero for opcodes that take
//! none.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::lexer::Position;
use crate::options::FileOptions;

/// A compiled program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// File the program was compiled from
    pub filename: Arc<str>,
    /// Dialect used at compile time
    pub options: FileOptions,
    /// Constant pool
    pub constants: Vec<Constant>,
    /// Function table; index 0 is the toplevel function
    pub functions: Vec<Funcode>,
    /// Global variables, indexed by `Global`/`SetGlobal`
    pub globals: Vec<Named>,
    /// Predeclared names, indexed by `Predeclared`
    pub predeclared: Vec<String>,
    /// Universal names, indexed by `Universal`
    pub universals: Vec<String>,
}

impl Program {
    /// Returns the toplevel function.
    pub fn toplevel(&self) -> &Funcode {
        &self.functions[0]
    }
}

/// A name with the position at which it was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    /// The name
    pub name: String,
    /// Declaration position
    pub pos: Position,
}

/// A literal in the constant pool.
#[derive(Debug, Clone)]
pub enum Constant {
    /// String literal
    String(String),
    /// Bytes literal
    Bytes(Vec<u8>),
    /// Integer that fits in 64 bits
    Int(i64),
    /// Integer that does not
    BigInt(BigInt),
    /// Float literal
    Float(f64),
}

// Floats compare by bit pattern so that the pool can be keyed by constant.
impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::Bytes(a), Constant::Bytes(b)) => a == b,
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::BigInt(a), Constant::BigInt(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::String(s) => s.hash(state),
            Constant::Bytes(b) => b.hash(state),
            Constant::Int(i) => i.hash(state),
            Constant::BigInt(i) => i.hash(state),
            Constant::Float(f) => f.to_bits().hash(state),
        }
    }
}

/// How a nested function obtains one of its free variables when created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capture {
    /// The cell in the given local slot of the creating frame
    Cell(u32),
    /// The given free variable of the creating function
    Free(u32),
}

/// A free variable of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeVar {
    /// Variable name
    pub name: String,
    /// Position of the first use in this function
    pub pos: Position,
    /// Where the enclosing frame keeps it
    pub source: Capture,
}

/// One row of a line table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    /// First instruction at this position
    pub pc: u32,
    /// Source position
    pub pos: Position,
}

/// A compiled function.
#[derive(Debug, Clone, PartialEq)]
pub struct Funcode {
    /// Function name; `<toplevel>` or `lambda` for those
    pub name: String,
    /// Position of the definition
    pub pos: Position,
    /// Doc string
    pub doc: Option<String>,
    /// Number of parameters including `*args` and `**kwargs`
    pub num_params: usize,
    /// Number of trailing positional parameters with defaults
    pub num_defaults: usize,
    /// Whether the function has `*args`
    pub has_varargs: bool,
    /// Whether the function has `**kwargs`
    pub has_kwargs: bool,
    /// Local slots; parameters first
    pub locals: Vec<Named>,
    /// Local slots that hold cells
    pub cells: Vec<usize>,
    /// Free variables, captured at creation time
    pub freevars: Vec<FreeVar>,
    /// Instructions
    pub code: Vec<Instruction>,
    /// Position table, sorted by pc
    pub lines: Vec<LineEntry>,
    /// Maximum operand stack depth
    pub max_stack: usize,
}

impl Funcode {
    /// Returns the source position of the instruction at `pc`.
    pub fn position(&self, pc: usize) -> Position {
        let idx = self.lines.partition_point(|entry| entry.pc as usize <= pc);
        match idx {
            0 => self.pos,
            n => self.lines[n - 1].pos,
        }
    }

    /// Number of positional parameters, excluding `*args` and `**kwargs`.
    pub fn num_positional(&self) -> usize {
        self.num_params - usize::from(self.has_varargs) - usize::from(self.has_kwargs)
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Argument; zero when the opcode takes none
    pub arg: u32,
}

impl Instruction {
    /// Creates a new instruction with no argument.
    pub fn simple(opcode: OpCode) -> Self {
        Self { opcode, arg: 0 }
    }

    /// Creates a new instruction with an argument.
    pub fn with_operand(opcode: OpCode, arg: u32) -> Self {
        Self { opcode, arg }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode.has_arg() {
            write!(f, "{:?} {}", self.opcode, self.arg)
        } else {
            write!(f, "{:?}", self.opcode)
        }
    }
}

/// Packs positional and named argument counts into a call argument.
pub fn call_arg(positional: usize, named: usize) -> u32 {
    ((positional as u32) << 8) | (named as u32 & 0xff)
}

/// Splits a call argument into positional and named counts.
pub fn split_call_arg(arg: u32) -> (usize, usize) {
    ((arg >> 8) as usize, (arg & 0xff) as usize)
}

macro_rules! opcodes {
    ($( $(#[$doc:meta])* $name:ident = $value:literal, )*) => {
        /// Operation codes for the VM.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $( $(#[$doc])* $name = $value, )*
        }

        impl OpCode {
            /// Decodes an opcode byte.
            pub fn from_u8(byte: u8) -> Option<OpCode> {
                match byte {
                    $( $value => Some(OpCode::$name), )*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    // Stack operations
    /// Do nothing
    Nop = 0,
    /// x -> x x
    Dup = 1,
    /// x y -> x y x y
    Dup2 = 2,
    /// x ->
    Pop = 3,
    /// x y -> y x
    Exch = 4,

    // Constants
    /// Push None
    None = 5,
    /// Push True
    True = 6,
    /// Push False
    False = 7,
    /// Push constant `arg`
    Constant = 8,

    // Variables
    /// Push local `arg`
    Local = 9,
    /// Pop into local `arg`
    SetLocal = 10,
    /// Push the contents of the cell in local `arg`
    LocalCell = 11,
    /// Pop into the cell in local `arg`
    SetLocalCell = 12,
    /// Push the contents of free variable `arg`
    Free = 13,
    /// Push global `arg`
    Global = 14,
    /// Pop into global `arg`
    SetGlobal = 15,
    /// Push predeclared value `arg`
    Predeclared = 16,
    /// Push universal value `arg`
    Universal = 17,

    // Unary operators
    /// +x
    UPlus = 18,
    /// -x
    UMinus = 19,
    /// ~x
    UTilde = 20,
    /// not x
    Not = 21,

    // Binary operators
    /// x == y
    Eql = 22,
    /// x != y
    Neq = 23,
    /// x < y
    Lt = 24,
    /// x <= y
    Le = 25,
    /// x > y
    Gt = 26,
    /// x >= y
    Ge = 27,
    /// x in y
    In = 28,
    /// x | y
    Pipe = 29,
    /// x ^ y
    Caret = 30,
    /// x & y
    Amp = 31,
    /// x << y
    Shl = 32,
    /// x >> y
    Shr = 33,
    /// x + y
    Plus = 34,
    /// x - y
    Minus = 35,
    /// x * y
    Star = 36,
    /// x / y
    Slash = 37,
    /// x // y
    SlashSlash = 38,
    /// x % y
    Percent = 39,

    // Control flow
    /// Jump to `arg`
    Jump = 40,
    /// Pop; jump to `arg` if falsy
    JumpIfFalse = 41,
    /// Pop; jump to `arg` if truthy
    JumpIfTrue = 42,
    /// Pop an iterable and start iterating it
    IterPush = 43,
    /// Push the next element, or jump to `arg` when exhausted
    IterJmp = 44,
    /// Stop the innermost iteration
    IterPop = 45,

    // Aggregates
    /// Pop `arg` values into a tuple
    MakeTuple = 46,
    /// Pop `arg` values into a list
    MakeList = 47,
    /// Push an empty dict
    MakeDict = 48,
    /// dict key value -> ; fails on a duplicate key
    SetDictUnique = 49,
    /// x y -> x[y]
    Index = 50,
    /// x y z -> ; x[y] = z
    SetIndex = 51,
    /// Pop a sequence of length `arg`, pushing its elements so the first is on top
    Unpack = 52,

    // Calls
    /// Call with `arg` = positional << 8 | named
    Call = 53,
    /// As `Call`, with a trailing `*args` operand
    CallVar = 54,
    /// As `Call`, with a trailing `**kwargs` operand
    CallKw = 55,
    /// As `Call`, with trailing `*args` and `**kwargs` operands
    CallVarKw = 56,
    /// Pop a tuple of defaults and push a new closure of function `arg`
    MakeFunc = 57,
    /// Pop the return value and leave the frame
    Return = 58,
    /// x y -> x + y, extending a list operand in place
    InplacePlus = 59,
}

impl OpCode {
    /// Returns true if the instruction uses its argument.
    pub fn has_arg(self) -> bool {
        matches!(
            self,
            OpCode::Constant
                | OpCode::Local
                | OpCode::SetLocal
                | OpCode::LocalCell
                | OpCode::SetLocalCell
                | OpCode::Free
                | OpCode::Global
                | OpCode::SetGlobal
                | OpCode::Predeclared
                | OpCode::Universal
                | OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfTrue
                | OpCode::IterJmp
                | OpCode::MakeTuple
                | OpCode::MakeList
                | OpCode::Unpack
                | OpCode::Call
                | OpCode::CallVar
                | OpCode::CallKw
                | OpCode::CallVarKw
                | OpCode::MakeFunc
        )
    }

    /// Returns true for instructions whose argument is a jump target.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::IterJmp
        )
    }

    /// Returns true for the call family.
    pub fn is_call(self) -> bool {
        matches!(self, OpCode::Call | OpCode::CallVar | OpCode::CallKw | OpCode::CallVarKw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_byte_roundtrip() {
        for byte in 0..=59u8 {
            let op = OpCode::from_u8(byte).expect("valid opcode");
            assert_eq!(op as u8, byte);
        }
        assert_eq!(OpCode::from_u8(60), None);
    }

    #[test]
    fn test_call_arg_packing() {
        assert_eq!(split_call_arg(call_arg(3, 2)), (3, 2));
        assert_eq!(split_call_arg(call_arg(0, 0)), (0, 0));
    }

    #[test]
    fn test_float_constants_compare_by_bits() {
        assert_eq!(Constant::Float(f64::NAN), Constant::Float(f64::NAN));
        assert_ne!(Constant::Float(0.0), Constant::Float(-0.0));
        assert_ne!(Constant::Int(1), Constant::Float(1.0));
    }

    #[test]
    fn test_position_lookup() {
        let fc = Funcode {
            name: "f".into(),
            pos: Position::new(1, 1),
            doc: None,
            num_params: 0,
            num_defaults: 0,
            has_varargs: false,
            has_kwargs: false,
            locals: vec![],
            cells: vec![],
            freevars: vec![],
            code: vec![Instruction::simple(OpCode::None); 6],
            lines: vec![
                LineEntry { pc: 0, pos: Position::new(2, 3) },
                LineEntry { pc: 4, pos: Position::new(3, 14) },
            ],
            max_stack: 1,
        };
        assert_eq!(fc.position(0), Position::new(2, 3));
        assert_eq!(fc.position(3), Position::new(2, 3));
        assert_eq!(fc.position(5), Position::new(3, 14));
    }

    #[test]
    fn test_instruction_display() {
        assert_eq!(Instruction::with_operand(OpCode::Local, 2).to_string(), "Local 2");
        assert_eq!(Instruction::simple(OpCode::Return).to_string(), "Return");
    }
}
