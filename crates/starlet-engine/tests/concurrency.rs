//! Concurrent evaluation of one shared program.

use std::sync::Arc;

use rayon::prelude::*;
use starlet_engine::{FileOptions, Program, StringDict, Thread, Value};

fn shared_program() -> Arc<Program> {
    let options = FileOptions {
        while_loops: true,
        ..FileOptions::default()
    };
    let src = "def count(limit):\n    items = []\n    i = 0\n    while i < limit:\n        items += [i]\n        i += 1\n    return items\n\nresult = count(n)\ntotal = len(result)\n";
    let (_, program) =
        starlet_engine::source_program_options(options, "count.star", src, &|name| name == "n").expect("Should compile");
    Arc::new(program)
}

fn predeclared(n: i64) -> StringDict {
    StringDict::from([("n".to_string(), Value::Int(n))])
}

#[test]
fn test_parallel_inits_are_independent() {
    let program = shared_program();
    let results: Vec<(i64, StringDict)> = (0..64i64)
        .into_par_iter()
        .map(|n| {
            let mut thread = Thread::new(format!("worker-{}", n));
            let globals = program.init(&mut thread, &predeclared(n)).expect("Should run");
            (n, globals)
        })
        .collect();

    for (n, globals) in results {
        assert_eq!(globals["total"], Value::Int(n));
        let Value::List(items) = &globals["result"] else {
            panic!("result is not a list");
        };
        assert!(items.is_frozen());
        assert_eq!(items.elems(), (0..n).map(Value::Int).collect::<Vec<_>>());
    }
}

#[test]
fn test_budget_failure_does_not_affect_other_inits() {
    let program = shared_program();
    let outcomes: Vec<Result<StringDict, String>> = (0..16)
        .into_par_iter()
        .map(|i| {
            let mut thread = Thread::new("budgeted");
            if i % 2 == 0 {
                thread.set_max_steps(50);
            }
            program
                .init(&mut thread, &predeclared(100))
                .map_err(|err| err.message().to_string())
        })
        .collect();

    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Err(msg) => {
                assert_eq!(i % 2, 0);
                assert_eq!(msg, "computation cancelled: too many steps");
            }
            Ok(globals) => {
                assert_eq!(i % 2, 1);
                assert_eq!(globals["total"], Value::Int(100));
            }
        }
    }
}

#[test]
fn test_cancel_from_another_thread() {
    let options = FileOptions {
        while_loops: true,
        ..FileOptions::default()
    };
    let (_, program) =
        starlet_engine::source_program_options(options, "spin.star", "def spin():\n    while True:\n        pass\n\nspin()\n", &|_| false)
            .expect("Should compile");
    let program = Arc::new(program);

    let mut thread = Thread::new("spinner");
    let handle = thread.cancel_handle();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(20));
        handle.cancel("shutdown");
    });
    let err = program.init(&mut thread, &StringDict::new()).expect_err("Should be cancelled");
    canceller.join().expect("Should join");

    assert_eq!(err.message(), "computation cancelled: shutdown");
    assert_eq!(
        err.call_stack().frames().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["<toplevel>", "spin"]
    );
}
