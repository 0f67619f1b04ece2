//! End-to-end use of the facade: configuration file, program cache and
//! evaluation.

use starlet::{Config, Engine, StarletError, StringDict, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const MUL: &str = "\ndef mul(a, b):\n    return a * b\n\ny = mul(x, n)\n";

fn mul_predeclared(n: Value) -> StringDict {
    StringDict::from([("x".to_string(), Value::from("mur")), ("n".to_string(), n)])
}

#[test]
fn test_cached_program_behaves_like_fresh() {
    init_tracing();
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config_path = dir.path().join("starlet.toml");
    let cache_dir = dir.path().join("cache");
    std::fs::write(&config_path, format!("cache_dir = {:?}\n", cache_dir.display().to_string()))
        .expect("Should write config");
    let config = Config::load(&config_path).expect("Should load config");

    // The first engine compiles and fills the cache, the second decodes.
    for _ in 0..2 {
        let engine = Engine::new(config.clone()).expect("Should create engine");
        let globals = engine.exec("mul.star", MUL, &mul_predeclared(Value::Int(2))).expect("Should run");
        assert_eq!(globals["y"], Value::from("murmur"));

        let err = engine
            .exec("mul.star", MUL, &mul_predeclared(Value::None))
            .expect_err("Should fail");
        let StarletError::Engine(starlet_engine::Error::Eval(eval)) = err else {
            panic!("expected an evaluation error");
        };
        assert_eq!(
            eval.backtrace(),
            "Traceback (most recent call last):\n  mul.star:5:8: in <toplevel>\n  mul.star:3:14: in mul\nError: unknown binary op: string * NoneType"
        );
    }
    assert_eq!(std::fs::read_dir(&cache_dir).expect("Should list cache").count(), 1);
}

#[test]
fn test_dialect_from_config() {
    init_tracing();
    let src = "def f(n):\n    if n == 0:\n        return 0\n    return n + f(n - 1)\n\nr = f(10)\n";

    let strict = Engine::new(Config::default()).expect("Should create engine");
    let err = strict.exec("f.star", src, &StringDict::new()).expect_err("Should reject recursion");
    assert_eq!(err.to_string(), "function f called recursively");

    let config = Config::from_toml_str("[dialect]\nrecursion = true\n").expect("Should parse config");
    let relaxed = Engine::new(config).expect("Should create engine");
    let globals = relaxed.exec("f.star", src, &StringDict::new()).expect("Should run");
    assert_eq!(globals["r"], Value::Int(55));
}

#[test]
fn test_cache_follows_predeclared_names() {
    init_tracing();
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let config = Config {
        cache_dir: Some(dir.path().join("cache")),
        ..Config::default()
    };
    let engine = Engine::new(config).expect("Should create engine");
    let src = "x = len([1, 2])\n";

    let shadowed = StringDict::from([("len".to_string(), Value::Int(0))]);
    let err = engine.exec("a.star", src, &shadowed).expect_err("len is an int here");
    assert_eq!(err.to_string(), "invalid call of non-function (int)");

    let globals = engine.exec("a.star", src, &StringDict::new()).expect("Should use the builtin");
    assert_eq!(globals["x"], Value::Int(2));
}
