//! Tests for name resolution.

use crate::ast::*;
use crate::error::StaticErrors;
use crate::options::FileOptions;
use crate::parser::Parser;
use crate::resolve::resolve_file;

fn resolve_with(src: &str, options: FileOptions) -> Result<File, StaticErrors> {
    let mut file = Parser::parse_file("test.star", src, options)?;
    resolve_file(&mut file, &|name| name == "host", &|name| {
        matches!(name, "len" | "None" | "True" | "print")
    })?;
    Ok(file)
}

fn resolve(src: &str) -> File {
    resolve_with(src, FileOptions::permissive()).expect("Should resolve")
}

fn resolve_err(src: &str, options: FileOptions) -> String {
    resolve_with(src, options).expect_err("Should fail").to_string()
}

fn strict() -> FileOptions {
    FileOptions {
        strict_multi_value_return: true,
        ..FileOptions::permissive()
    }
}

fn def_info(file: &File, index: usize) -> &FunctionInfo {
    match &file.stmts[index] {
        Stmt::Def(def) => def.function.as_ref().expect("resolved"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_globals_in_binding_order() {
    let file = resolve("b = 1\na = 2\ndef f():\n  return a + b\n");
    let module = file.module.as_ref().expect("module");
    let names: Vec<_> = module.globals.iter().map(|&id| module.binding(id).name.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "f"]);
}

#[test]
fn test_function_sees_later_globals() {
    resolve("def f():\n  return g\ng = 1\n");
}

#[test]
fn test_locals_params_first() {
    let file = resolve("def f(a, b):\n  c = a\n  for d in b:\n    pass\n");
    let info = def_info(&file, 0);
    let module = file.module.as_ref().expect("module");
    let names: Vec<_> = info.locals.iter().map(|&id| module.binding(id).name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
    assert!(info.cells.is_empty());
}

#[test]
fn test_captured_local_becomes_cell() {
    let file = resolve("def f(x):\n  y = 1\n  def g():\n    return x + y\n  return g\n");
    let info = def_info(&file, 0);
    assert_eq!(info.cells, vec![0, 1]);
    let module = file.module.as_ref().expect("module");
    assert_eq!(module.binding(info.locals[0]).scope, Scope::Cell);
}

#[test]
fn test_free_variable_threaded_through_intermediate() {
    let file = resolve("def f():\n  x = 1\n  def g():\n    def h():\n      return x\n    return h\n  return g\n");
    let module = file.module.as_ref().expect("module");
    let f = def_info(&file, 0);
    let g = match &file_def_body(&file, 0)[1] {
        Stmt::Def(def) => def.function.as_ref().expect("resolved"),
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(g.freevars.len(), 1);
    assert_eq!(g.freevars[0], f.locals[0]);
    assert_eq!(module.binding(f.locals[0]).scope, Scope::Cell);
}

fn file_def_body(file: &File, index: usize) -> &[Stmt] {
    match &file.stmts[index] {
        Stmt::Def(def) => &def.body,
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_predeclared_and_universal() {
    let file = resolve("x = len(host)\n");
    let module = file.module.as_ref().expect("module");
    assert_eq!(module.predeclared, vec!["host"]);
    assert_eq!(module.universals, vec!["len"]);
}

#[test]
fn test_undefined_name() {
    assert_eq!(resolve_err("x = y\n", FileOptions::default()), "test.star:1:5: undefined: y");
}

#[test]
fn test_errors_aggregated() {
    let err = resolve_err("x = y\nz = w\n", FileOptions::default());
    assert_eq!(err, "test.star:1:5: undefined: y\ntest.star:2:5: undefined: w");
}

#[test]
fn test_global_reassign() {
    let err = resolve_err("x = 1\nx = 2\n", FileOptions::default());
    assert_eq!(err, "test.star:2:1: cannot reassign global x declared at 1:1");
    resolve("x = 1\nx = 2\n");
}

#[test]
fn test_toplevel_control() {
    let err = resolve_err("if True:\n  pass\n", FileOptions::default());
    assert!(err.contains("if statement not within a function"));
    let err = resolve_err("for x in host:\n  pass\n", FileOptions::default());
    assert!(err.contains("for loop not within a function"));
}

#[test]
fn test_while_not_allowed() {
    let err = resolve_err("def f():\n  while True:\n    pass\n", FileOptions::default());
    assert!(err.contains("while loop not allowed"));
}

#[test]
fn test_branch_outside_loop() {
    assert!(resolve_err("def f():\n  break\n", FileOptions::default()).contains("break not in a loop"));
    assert!(resolve_err("def f():\n  continue\n", FileOptions::default()).contains("continue not in a loop"));
    let err = resolve_err("def f():\n  for x in host:\n    def g():\n      break\n", FileOptions::default());
    assert!(err.contains("break not in a loop"));
}

#[test]
fn test_return_at_toplevel() {
    let err = resolve_err("return 1\n", FileOptions::default());
    assert!(err.contains("return statement not within a function"));
}

#[test]
fn test_duplicate_parameter_and_keyword() {
    assert!(resolve_err("def f(a, a):\n  pass\n", FileOptions::default()).contains("duplicate parameter: a"));
    assert!(resolve_err("x = len(a=1, a=2)\n", FileOptions::default()).contains("keyword argument a repeated"));
}

#[test]
fn test_strict_implicit_tuple_rejected() {
    for src in ["x = 1, 2\n", "x = 1, 2, 3\n"] {
        let err = resolve_err(src, strict());
        assert!(err.contains("implicit tuple not allowed; use parentheses or brackets"), "{}", err);
    }
}

#[test]
fn test_strict_implicit_tuple_accepted() {
    for src in ["x = (1, 2)\n", "x = [1, 2]\n", "a, b = 1, 2\n", "a, b = (1, 2)\n", "x = 42\n"] {
        resolve_with(src, strict()).expect(src);
    }
}

#[test]
fn test_strict_augmented_implicit_tuple() {
    let err = resolve_err("x = ()\nx += 1, 2\n", strict());
    assert!(err.contains("implicit tuple not allowed"));
}

#[test]
fn test_implicit_tuple_allowed_without_strict() {
    resolve("x = 1, 2\n");
}

#[test]
fn test_return_count_mismatch() {
    let src = "def f(x):\n  if x:\n    return 1, 2\n  return\n";
    assert_eq!(
        resolve_err(src, strict()),
        "test.star:4:3: multi-value return count mismatch: found 2 and 1 values"
    );
    resolve(src);
}

#[test]
fn test_return_count_three_branches() {
    let src = "def f(x):\n  if x == 1:\n    return 1\n  elif x == 2:\n    return 1, 2\n  else:\n    return 1, 2, 3\n";
    assert!(resolve_err(src, strict()).contains("multi-value return count mismatch"));
}

#[test]
fn test_lambda_resolution() {
    let file = resolve("def f(n):\n  return lambda x: x * n\n");
    let info = def_info(&file, 0);
    assert_eq!(info.cells, vec![0]);
}
