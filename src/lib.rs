// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # starlet
//!
//! Embeddable, sandboxed configuration language.
//!
//! This crate ties the [`starlet_engine`] compiler and virtual machine to a
//! TOML [`Config`] and an on-disk [`ProgramCache`].
//!
//! ## Quick Start
//!
//! ```rust
//! use starlet::{Config, Engine, StringDict, Value};
//!
//! let engine = Engine::new(Config::default()).expect("Should create engine");
//! let mut predeclared = StringDict::new();
//! predeclared.insert("name".to_string(), Value::from("world"));
//! let globals = engine
//!     .exec("hello.star", "greeting = \"hello \" + name\n", &predeclared)
//!     .expect("Should run");
//! assert_eq!(globals["greeting"], Value::from("hello world"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;

use std::sync::Arc;

use tracing::debug;

pub use cache::ProgramCache;
pub use config::Config;
pub use error::{Result, StarletError};
pub use starlet_engine::{
    Arguments, CallStack, EvalError, FileOptions, Program, StringDict, Thread, Value,
};

/// Compiles and runs programs according to a [`Config`].
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    cache: Option<ProgramCache>,
}

impl Engine {
    /// Creates an engine, opening the program cache if one is configured.
    pub fn new(config: Config) -> Result<Self> {
        let cache = config.cache_dir.as_ref().map(ProgramCache::new).transpose()?;
        Ok(Self { config, cache })
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compiles `src`, going through the program cache when there is one.
    pub fn compile(&self, filename: &str, src: &str, is_predeclared: &dyn Fn(&str) -> bool) -> Result<Arc<Program>> {
        let options = self.config.dialect;
        let program = match &self.cache {
            Some(cache) => cache.load_or_compile(filename, src, options, is_predeclared)?,
            None => {
                starlet_engine::source_program_options(options, filename, src, is_predeclared)
                    .map_err(StarletError::Engine)?
                    .1
            }
        };
        Ok(Arc::new(program))
    }

    /// Compiles and initializes `src` with `predeclared` bound, returning its
    /// globals.
    pub fn exec(&self, filename: &str, src: &str, predeclared: &StringDict) -> Result<StringDict> {
        let program = self.compile(filename, src, &|name| predeclared.contains_key(name))?;
        let mut thread = self.config.thread(filename);
        let globals = program.init(&mut thread, predeclared)?;
        debug!(filename, steps = thread.steps(), "executed program");
        Ok(globals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_without_cache() {
        let engine = Engine::new(Config::default()).expect("Should create engine");
        let globals = engine.exec("a.star", "x = [1, 2] + [3]\n", &StringDict::new()).expect("Should run");
        assert_eq!(globals["x"].repr(), "[1, 2, 3]");
    }

    #[test]
    fn test_exec_reports_traceback() {
        let engine = Engine::new(Config::default()).expect("Should create engine");
        let err = engine
            .exec("a.star", "def f():\n    return 1 // 0\n\nx = f()\n", &StringDict::new())
            .expect_err("Should fail");
        let StarletError::Engine(starlet_engine::Error::Eval(eval)) = err else {
            panic!("expected an evaluation error, got {:?}", err);
        };
        assert_eq!(eval.message(), "integer division by zero");
        assert_eq!(eval.call_stack().len(), 2);
    }

    #[test]
    fn test_exec_with_cache_and_budget() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let config = Config {
            dialect: FileOptions {
                while_loops: true,
                ..FileOptions::default()
            },
            cache_dir: Some(dir.path().to_path_buf()),
            max_steps: 200,
        };
        let engine = Engine::new(config).expect("Should create engine");
        let src = "def spin():\n    while True:\n        pass\n\nspin()\n";
        for _ in 0..2 {
            let err = engine.exec("spin.star", src, &StringDict::new()).expect_err("Should exhaust budget");
            assert!(err.to_string().contains("computation cancelled: too many steps"), "{}", err);
        }
        let cached = std::fs::read_dir(dir.path()).expect("Should list cache").count();
        assert_eq!(cached, 1);
    }
}
