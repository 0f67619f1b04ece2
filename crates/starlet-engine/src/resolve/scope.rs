//! Per-function scope tracking during resolution.

use rustc_hash::FxHashMap;

use crate::ast::{Binding, BindingId, FunctionInfo, Scope};

/// The names visible inside one function being resolved.
#[derive(Debug, Default)]
pub struct FunctionScope {
    /// Local names (parameters and every name bound in the body)
    names: FxHashMap<String, BindingId>,
    /// Local bindings in slot order
    locals: Vec<BindingId>,
    /// Free names already threaded into this function
    free: FxHashMap<String, BindingId>,
    /// For each free variable, the binding it captures in the enclosing function
    freevars: Vec<BindingId>,
    /// Nesting depth of `for`/`while` at the current point
    pub loop_depth: usize,
    /// Whether a `*args` parameter was declared
    pub has_varargs: bool,
    /// Whether a `**kwargs` parameter was declared
    pub has_kwargs: bool,
}

impl FunctionScope {
    /// Creates an empty function scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `name` is already a local of this function.
    pub fn is_local(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Declares a local in the next slot. The binding must already be in the
    /// arena with `Scope::Local` and `index == self.local_count()`.
    pub fn declare(&mut self, name: &str, id: BindingId) {
        self.names.insert(name.to_string(), id);
        self.locals.push(id);
    }

    /// Number of local slots declared so far.
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Number of free variables threaded so far.
    pub fn free_count(&self) -> usize {
        self.freevars.len()
    }

    /// Resolves a name to a local or an already-threaded free variable.
    pub fn resolve(&self, name: &str) -> Option<BindingId> {
        self.names.get(name).or_else(|| self.free.get(name)).copied()
    }

    /// Threads a free variable into this function. `outer` is the binding in
    /// the enclosing function, `id` the new `Scope::Free` binding.
    pub fn add_free(&mut self, name: &str, id: BindingId, outer: BindingId) {
        self.free.insert(name.to_string(), id);
        self.freevars.push(outer);
    }

    /// Finishes the function, listing the locals that were promoted to cells.
    pub fn into_info(self, bindings: &[Binding]) -> FunctionInfo {
        let cells = self
            .locals
            .iter()
            .enumerate()
            .filter(|(_, id)| bindings[id.0 as usize].scope == Scope::Cell)
            .map(|(slot, _)| slot)
            .collect();
        FunctionInfo {
            locals: self.locals,
            cells,
            freevars: self.freevars,
            has_varargs: self.has_varargs,
            has_kwargs: self.has_kwargs,
        }
    }
}
