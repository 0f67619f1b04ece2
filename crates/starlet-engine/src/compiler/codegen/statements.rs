//! Statement compilation documentation.
//!
//! This module documents the statement compilation logic in `mod.rs`.
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `x = e` | `SetLocal`, `SetLocalCell`, `SetGlobal` | By binding scope |
//! | `a, b = e` | `Unpack` | Then one store per target |
//! | `x[i] = e` | `Exch`, `SetIndex` | Value is computed first |
//! | `x += e` | `InplacePlus` | Other operators use the binary opcode |
//! | `def` | `MakeTuple`, `MakeFunc` | Defaults evaluated at definition |
//! | `if/else` | `JumpIfFalse`, `Jump` | |
//! | `for` | `IterPush`, `IterJmp`, `IterPop` | |
//! | `while` | `JumpIfFalse`, `Jump` (back) | |
//! | `break/continue` | `Jump` | `break` patched to the loop end |
//! | `return` | `Return` | Bare `return` returns None |
//!
//! ### For Loop
//!
//! ```text
//! for x in seq: body
//!
//! Bytecode:
//!   [seq bytecode]
//!   IterPush
//! loop_label:
//!   IterJmp -> end_label (jumps when exhausted)
//!   [store x]
//!   [body bytecode]
//!   Jump -> loop_label
//! end_label:
//!   IterPop
//! ```
//!
//! Every function ends with `None; Return` so that falling off the end
//! returns None.

// This module serves as documentation. The actual implementation is in mod.rs.

#[cfg(test)]
mod tests {
    use crate::compiler::{Funcode, OpCode, Program};
    use crate::options::FileOptions;

    fn compile(src: &str) -> Program {
        let (_, program) = crate::source_program_options(FileOptions::permissive(), "t.star", src, &|_| false)
            .expect("Should compile");
        program
    }

    fn opcodes(fc: &Funcode) -> Vec<OpCode> {
        fc.code.iter().map(|i| i.opcode).collect()
    }

    #[test]
    fn test_compile_global_assignment() {
        let program = compile("x = 1\n");
        assert_eq!(
            opcodes(program.toplevel()),
            vec![OpCode::Constant, OpCode::SetGlobal, OpCode::None, OpCode::Return]
        );
        assert_eq!(program.globals[0].name, "x");
    }

    #[test]
    fn test_compile_unpack() {
        let program = compile("a, b = 1, 2\n");
        let ops = opcodes(program.toplevel());
        assert!(ops.contains(&OpCode::Unpack));
        assert_eq!(ops.iter().filter(|op| **op == OpCode::SetGlobal).count(), 2);
    }

    #[test]
    fn test_compile_def_creates_function() {
        let program = compile("def f(a, b=2):\n  return a\n");
        assert_eq!(program.functions.len(), 2);
        let f = &program.functions[1];
        assert_eq!(f.name, "f");
        assert_eq!(f.num_params, 2);
        assert_eq!(f.num_defaults, 1);
        assert!(opcodes(program.toplevel()).contains(&OpCode::MakeFunc));
    }

    #[test]
    fn test_compile_for_loop() {
        let program = compile("def f(xs):\n  for x in xs:\n    if x:\n      break\n    continue\n");
        let ops = opcodes(&program.functions[1]);
        assert!(ops.contains(&OpCode::IterPush));
        assert!(ops.contains(&OpCode::IterJmp));
        assert!(ops.contains(&OpCode::IterPop));
        let f = &program.functions[1];
        let end = f.code.iter().position(|i| i.opcode == OpCode::IterPop).expect("IterPop");
        let jmp = f.code.iter().find(|i| i.opcode == OpCode::IterJmp).expect("IterJmp");
        assert_eq!(jmp.arg as usize, end);
    }

    #[test]
    fn test_compile_while_loop() {
        let program = compile("def f():\n  while True:\n    break\n");
        let f = &program.functions[1];
        let back = f.code.iter().filter(|i| i.opcode == OpCode::Jump).count();
        assert!(back >= 2);
    }

    #[test]
    fn test_compile_cell_store() {
        let program = compile("def f():\n  x = 1\n  return lambda: x\n");
        let f = &program.functions[1];
        assert_eq!(f.cells, vec![0]);
        assert!(opcodes(f).contains(&OpCode::SetLocalCell));
        let lambda = &program.functions[2];
        assert_eq!(lambda.name, "lambda");
        assert!(opcodes(lambda).contains(&OpCode::Free));
    }

    #[test]
    fn test_compile_augmented_plus_is_inplace() {
        let program = compile("x = []\nx += [1]\n");
        assert!(opcodes(program.toplevel()).contains(&OpCode::InplacePlus));
    }
}
