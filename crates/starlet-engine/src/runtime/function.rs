//! Callable values and the module state they close over.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::value::Value;
use crate::compiler::{Constant, Funcode, Program};
use crate::lexer::Position;
use crate::vm::Thread;

/// A variable shared between a frame and the closures that capture it.
pub type Cell = Arc<Mutex<Option<Value>>>;

/// Creates a cell holding `value`.
pub fn new_cell(value: Option<Value>) -> Cell {
    Arc::new(Mutex::new(value))
}

/// Per-execution state of one program: the values of its predeclared and
/// universal names and its global slots.
pub struct Module {
    pub(crate) program: Arc<Program>,
    pub(crate) constants: Vec<Value>,
    pub(crate) predeclared: Vec<Value>,
    pub(crate) universals: Vec<Value>,
    pub(crate) globals: Mutex<Vec<Option<Value>>>,
}

impl Module {
    pub(crate) fn new(program: Arc<Program>, predeclared: Vec<Value>, universals: Vec<Value>) -> Self {
        let globals = vec![None; program.globals.len()];
        let constants = program.constants.iter().map(constant_value).collect();
        Self {
            program,
            constants,
            predeclared,
            universals,
            globals: Mutex::new(globals),
        }
    }

    /// The program this module executes.
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::String(s) => Value::from(s.as_str()),
        Constant::Bytes(b) => Value::Bytes(Arc::from(b.as_slice())),
        Constant::Int(i) => Value::Int(*i),
        Constant::BigInt(i) => Value::from_bigint(i.clone()),
        Constant::Float(f) => Value::Float(*f),
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({})", self.program.filename)
    }
}

/// A function value: compiled code plus its defaults and captured cells.
pub struct Function {
    pub(crate) module: Arc<Module>,
    pub(crate) index: usize,
    pub(crate) defaults: Vec<Value>,
    pub(crate) freevars: Vec<Cell>,
    pub(crate) frozen: AtomicBool,
}

impl Function {
    /// The compiled code.
    pub fn funcode(&self) -> &Funcode {
        &self.module.program.functions[self.index]
    }

    /// The function name, `lambda` for anonymous functions.
    pub fn name(&self) -> &str {
        &self.funcode().name
    }

    /// The doc string, if any.
    pub fn doc(&self) -> Option<&str> {
        self.funcode().doc.as_deref()
    }

    /// Where the function was defined.
    pub fn position(&self) -> Position {
        self.funcode().pos
    }

    /// Returns true if both values run the same compiled code of the same
    /// module.
    pub(crate) fn same_code(&self, other: &Function) -> bool {
        self.index == other.index && Arc::ptr_eq(&self.module, &other.module)
    }

    /// Sets the frozen flag, returning false if it was already set.
    pub(crate) fn mark_frozen(&self) -> bool {
        !self.frozen.swap(true, Ordering::AcqRel)
    }

    /// The default values and the current contents of the captured cells.
    pub(crate) fn captured(&self) -> Vec<Value> {
        let cells = self.freevars.iter().filter_map(|cell| cell.lock().clone());
        self.defaults.iter().cloned().chain(cells).collect()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name())
    }
}

/// Arguments passed to a builtin.
#[derive(Debug, Default)]
pub struct Arguments {
    /// Positional arguments, `*args` expanded
    pub positional: Vec<Value>,
    /// Keyword arguments, `**kwargs` expanded
    pub named: Vec<(String, Value)>,
}

impl Arguments {
    /// Removes and returns the keyword argument `name`.
    pub fn take_named(&mut self, name: &str) -> Option<Value> {
        let at = self.named.iter().position(|(n, _)| n == name)?;
        Some(self.named.remove(at).1)
    }

    /// Fails unless there are no keyword arguments.
    pub fn no_named(&self) -> Result<(), String> {
        match self.named.first() {
            Some((name, _)) => Err(format!("unexpected keyword argument \"{}\"", name)),
            None => Ok(()),
        }
    }

    /// Fails unless the positional count is within `min..=max`.
    pub fn arity(&self, min: usize, max: usize) -> Result<(), String> {
        let n = self.positional.len();
        if n < min {
            return Err(format!("got {} arguments, want at least {}", n, min));
        }
        if n > max {
            return Err(format!("got {} arguments, want at most {}", n, max));
        }
        Ok(())
    }
}

/// A native function.
pub type NativeFunction = fn(&mut Thread, Arguments) -> Result<Value, String>;

/// A function implemented in Rust.
pub struct Builtin {
    /// The function name
    pub name: &'static str,
    /// The implementation
    pub func: NativeFunction,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_messages() {
        let args = Arguments {
            positional: vec![Value::None, Value::None],
            named: Vec::new(),
        };
        assert!(args.arity(1, 2).is_ok());
        assert_eq!(args.arity(0, 1).expect_err("too many"), "got 2 arguments, want at most 1");
        assert_eq!(args.arity(3, 3).expect_err("too few"), "got 2 arguments, want at least 3");
    }

    #[test]
    fn test_no_named() {
        let args = Arguments {
            positional: Vec::new(),
            named: vec![("sep".to_string(), Value::None)],
        };
        assert_eq!(args.no_named().expect_err("named"), "unexpected keyword argument \"sep\"");
    }

    #[test]
    fn test_cell_is_shared() {
        let cell = new_cell(None);
        let alias = cell.clone();
        *alias.lock() = Some(Value::Int(3));
        assert_eq!(cell.lock().clone(), Some(Value::Int(3)));
    }
}
