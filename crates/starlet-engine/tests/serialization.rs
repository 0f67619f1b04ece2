//! Round trips of compiled programs through the binary format.
//!
//! A decoded program must behave exactly like the program it was encoded
//! from: same globals, same errors, same tracebacks.

use std::sync::Arc;

use starlet_engine::{DecodeError, Error, EvalError, FileOptions, Program, StringDict, Thread, Value};

const MUL: &str = "\ndef mul(a, b):\n    return a * b\n\ny = mul(x, n)\n";

const MUL_TRACEBACK: &str = "Traceback (most recent call last):\n  mul.star:5:8: in <toplevel>\n  mul.star:3:14: in mul\nError: unknown binary op: string * NoneType";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn compile_mul() -> Program {
    let (_, program) =
        starlet_engine::source_program("mul.star", MUL, &|name| name == "x" || name == "n").expect("Should compile");
    program
}

fn run_mul(program: &Arc<Program>, n: Value) -> Result<StringDict, EvalError> {
    let mut predeclared = StringDict::new();
    predeclared.insert("x".to_string(), Value::from("mur"));
    predeclared.insert("n".to_string(), n);
    program.init(&mut Thread::new("mul"), &predeclared)
}

#[test]
fn test_fresh_program_runs() {
    let program = Arc::new(compile_mul());
    let globals = run_mul(&program, Value::Int(2)).expect("Should run");
    assert_eq!(globals["y"], Value::from("murmur"));
}

#[test]
fn test_fresh_program_traceback() {
    let program = Arc::new(compile_mul());
    let err = run_mul(&program, Value::None).expect_err("Should fail");
    assert_eq!(err.backtrace(), MUL_TRACEBACK);
    assert_eq!(err.to_string(), "unknown binary op: string * NoneType");
}

#[test]
fn test_decoded_program_matches_fresh() {
    init_tracing();
    let fresh = compile_mul();
    let decoded = Program::decode(&fresh.encode()).expect("Should decode");
    assert_eq!(decoded, fresh);

    let fresh = Arc::new(fresh);
    let decoded = Arc::new(decoded);
    let a = run_mul(&fresh, Value::Int(2)).expect("Should run");
    let b = run_mul(&decoded, Value::Int(2)).expect("Should run");
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    assert_eq!(a["y"], b["y"]);

    let a = run_mul(&fresh, Value::None).expect_err("Should fail");
    let b = run_mul(&decoded, Value::None).expect_err("Should fail");
    assert_eq!(b.backtrace(), MUL_TRACEBACK);
    assert_eq!(a, b);
}

#[test]
fn test_write_to_and_compiled_program() {
    let program = compile_mul();
    let mut buf = Vec::new();
    program.write_to(&mut buf).expect("Should write");
    assert_eq!(buf, program.encode());

    let decoded = starlet_engine::compiled_program(buf.as_slice()).expect("Should decode");
    let globals = run_mul(&Arc::new(decoded), Value::Int(3)).expect("Should run");
    assert_eq!(globals["y"], Value::from("murmurmur"));
}

#[test]
fn test_garbage_is_rejected() {
    let garbage = b"This is not a compiled Starlark program.";
    let err = Program::decode(garbage).expect_err("Should reject");
    assert_eq!(err, DecodeError::NotCompiled);
    assert!(err.to_string().contains("not a compiled module"));

    let err = starlet_engine::compiled_program(&garbage[..]).expect_err("Should reject");
    assert!(matches!(err, Error::Decode(DecodeError::NotCompiled)));
    assert!(err.to_string().contains("not a compiled module"));
}

#[test]
fn test_failure_kinds_are_distinct() {
    let bytes = compile_mul().encode();

    let mut future = bytes.clone();
    future[4] = 99;
    let err = Program::decode(&future).expect_err("Should reject version");
    assert_eq!(err.kind(), "version");

    let err = Program::decode(&bytes[..bytes.len() - 1]).expect_err("Should reject truncation");
    assert!(matches!(err.kind(), "truncated" | "corrupt"), "{}", err);

    assert_eq!(Program::decode(&[]).expect_err("Should reject empty").kind(), "foreign");
}

#[test]
fn test_encoding_is_deterministic() {
    assert_eq!(compile_mul().encode(), compile_mul().encode());
}

#[test]
fn test_dialect_survives_round_trip() {
    let options = FileOptions {
        recursion: true,
        ..FileOptions::default()
    };
    let src = "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\n\nr = fib(15)\n";
    let (_, program) = starlet_engine::source_program_options(options, "fib.star", src, &|_| false)
        .expect("Should compile");
    let decoded = Program::decode(&program.encode()).expect("Should decode");
    assert_eq!(decoded.options, options);

    let globals = Arc::new(decoded)
        .init(&mut Thread::new("fib"), &StringDict::new())
        .expect("Should run");
    assert_eq!(globals["r"], Value::Int(610));
}
