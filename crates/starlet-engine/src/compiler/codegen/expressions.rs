//! Expression compilation documentation.
//!
//! Expressions leave exactly one value on the operand stack.
//!
//! | Expression | Key Operations | Stack Effect |
//! |------------|----------------|--------------|
//! | Literal | `Constant` | Push value |
//! | Identifier | `Local`/`LocalCell`/`Free`/`Global`/`Predeclared`/`Universal` | Push value |
//! | Binary | `Plus`/`Minus`/etc | Pop 2, push 1 |
//! | `and`/`or` | `Dup`, `JumpIfFalse`/`JumpIfTrue`, `Pop` | Short circuit |
//! | `not in` | `In`, `Not` | Pop 2, push 1 |
//! | Unary | `UMinus`/`Not`/etc | Pop 1, push 1 |
//! | Call | `Call`/`CallVar`/`CallKw`/`CallVarKw` | Pop callee and arguments, push result |
//! | Index | `Index` | Pop 2, push 1 |
//! | Tuple/List | `MakeTuple`/`MakeList` | Pop N, push 1 |
//! | Dict | `MakeDict`, `SetDictUnique` | Push 1 |
//! | Lambda | `MakeTuple`, `MakeFunc` | Push closure |
//! | Conditional | `JumpIfFalse`, `Jump` | Push 1 |
//!
//! ## Calls
//!
//! The call argument packs the positional count in the high bits and the
//! named count in the low 8 bits. Named arguments are pushed as a name
//! constant followed by the value.
//!
//! ```text
//! f(1, k=2, *rest)
//!
//! Bytecode:
//!   Global f
//!   Constant 1
//!   Constant "k"
//!   Constant 2
//!   Global rest
//!   CallVar (1 << 8 | 1)
//! ```
//!
//! ## Positions
//!
//! The line table records the position of each call at its `(`, of each
//! binary operator at the operator, and of each index at its `[`, so that a
//! failing instruction reports the most specific location.
