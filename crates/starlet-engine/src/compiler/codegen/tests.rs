//! Tests for the bytecode compiler.

use super::*;
use crate::options::FileOptions;
use crate::parser::Parser;
use crate::resolve::resolve_file;

fn resolved(src: &str) -> File {
    let mut file = Parser::parse_file("t.star", src, FileOptions::permissive()).expect("Should parse");
    resolve_file(&mut file, &|_| false, &crate::builtins::is_universal).expect("Should resolve");
    file
}

fn compile_ok(src: &str) -> Program {
    compile_file(&resolved(src)).expect("Compilation should succeed")
}

#[test]
fn test_compile_empty_file() {
    let program = compile_ok("");
    assert_eq!(program.functions.len(), 1);
    assert_eq!(program.toplevel().name, "<toplevel>");
    // None; Return
    assert_eq!(program.toplevel().code.len(), 2);
}

#[test]
fn test_compile_unresolved_file_fails() {
    let file = Parser::parse_file("t.star", "x = 1\n", FileOptions::default()).expect("Should parse");
    let err = compile_file(&file).expect_err("unresolved");
    assert!(err.to_string().contains("not been resolved"));
}

#[test]
fn test_compile_is_deterministic() {
    let src = "def f(a, *args, **kwargs):\n  return [a, args, kwargs, 1, 2.5, \"s\"]\nx = f(1)\n";
    assert_eq!(compile_ok(src), compile_ok(src));
}

#[test]
fn test_compile_nested_free_variables() {
    let program = compile_ok("def f():\n  x = 1\n  def g():\n    def h():\n      return x\n    return h\n  return g\n");
    // toplevel, f, g, h in order of reservation
    let names: Vec<_> = program.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["<toplevel>", "f", "g", "h"]);
    assert_eq!(program.functions[2].freevars[0].source, Capture::Cell(0));
    assert_eq!(program.functions[3].freevars[0].source, Capture::Free(0));
}

#[test]
fn test_compile_doc_and_params() {
    let program = compile_ok("def f(a, *args, **kwargs):\n  \"hello\"\n  pass\n");
    let f = &program.functions[1];
    assert_eq!(f.doc.as_deref(), Some("hello"));
    assert!(f.has_varargs);
    assert!(f.has_kwargs);
    assert_eq!(f.num_positional(), 1);
    let locals: Vec<_> = f.locals.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(locals, vec!["a", "args", "kwargs"]);
}

#[test]
fn test_compile_universal_names() {
    let program = compile_ok("x = len([])\n");
    assert_eq!(program.universals, vec!["len"]);
}

#[test]
fn test_stack_effects_balance() {
    let program = compile_ok("def f(d):\n  d[1] += 2\n  a, b = d[0]\n  return a if b else None\n");
    for fc in &program.functions {
        assert!(fc.max_stack > 0);
    }
}
