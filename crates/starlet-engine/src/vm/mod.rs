//! The virtual machine.
//!
//! [`Program::init`] executes a program's toplevel code on a [`Thread`] and
//! returns the globals it assigned. Functions among those globals can be
//! called later with [`Thread::call`].
//!
//! ## Structure
//!
//! - `thread` - per-evaluation state: print hook, step budget, cancellation
//! - `interpreter` - frames, argument binding and the dispatch loop

mod interpreter;
mod thread;


use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::debug;

pub use thread::{CancelHandle, Thread};

use crate::builtins;
use crate::compiler::Program;
use crate::error::{CallStack, EvalError};
use crate::runtime::function::{Arguments, Function, Module};
use crate::runtime::value::Value;

/// Name/value bindings, sorted by name.
pub type StringDict = BTreeMap<String, Value>;

impl Program {
    /// Executes the toplevel code of the program and returns its globals.
    ///
    /// Every predeclared name the program refers to must be bound in
    /// `predeclared`. Globals the toplevel never assigned are omitted.
    /// The returned values are frozen.
    pub fn init(self: &Arc<Self>, thread: &mut Thread, predeclared: &StringDict) -> Result<StringDict, EvalError> {
        debug!(path = %self.filename, thread = thread.name(), "init");

        let mut values = Vec::with_capacity(self.predeclared.len());
        for name in &self.predeclared {
            let Some(value) = predeclared.get(name) else {
                return Err(EvalError::new(
                    format!("missing predeclared binding: {}", name),
                    CallStack::default(),
                ));
            };
            values.push(value.clone());
        }
        let mut universals = Vec::with_capacity(self.universals.len());
        for name in &self.universals {
            let Some(value) = builtins::universe_value(name) else {
                return Err(EvalError::new(format!("undefined: {}", name), CallStack::default()));
            };
            universals.push(value);
        }

        let module = Arc::new(Module::new(self.clone(), values, universals));
        let toplevel = Arc::new(Function {
            module: module.clone(),
            index: 0,
            defaults: Vec::new(),
            freevars: Vec::new(),
            frozen: AtomicBool::new(false),
        });
        interpreter::call(thread, toplevel, Arguments::default())?;

        let assigned = module.globals.lock().clone();
        let globals: StringDict = self
            .globals
            .iter()
            .zip(assigned)
            .filter_map(|(global, value)| Some((global.name.clone(), value?)))
            .collect();
        globals.values().for_each(Value::freeze);
        debug!(
            path = %self.filename,
            globals = globals.len(),
            steps = thread.steps(),
            "init finished"
        );
        Ok(globals)
    }
}

impl Thread {
    /// Calls a function or builtin value with `args`.
    pub fn call(&mut self, callee: &Value, args: Arguments) -> Result<Value, EvalError> {
        match callee {
            Value::Function(f) => interpreter::call(self, f.clone(), args),
            Value::Builtin(b) => (b.func)(self, args)
                .map_err(|msg| EvalError::new(format!("{}: {}", b.name, msg), self.call_stack())),
            other => Err(EvalError::new(
                format!("invalid call of non-function ({})", other.type_name()),
                self.call_stack(),
            )),
        }
    }
}
