//! Name resolution and static checks.
//!
//! The resolver walks a parsed [`File`], binds every identifier to a
//! [`Binding`] and annotates each function with its [`FunctionInfo`]. All
//! errors in a file are collected and reported together.
//!
//! ## Structure
//!
//! - `scope.rs` - Per-function locals, free variables and loop depth
//! - `strict.rs` - Implicit tuple and return arity checks
//!
//! ## Rules
//!
//! A name bound anywhere in a function body is local to the whole function.
//! Toplevel bindings are globals, visible to every function in the file.
//! Other names resolve to predeclared names, then to universal built-ins.
//! A local read by a nested function becomes a cell, and the variable is
//! threaded as a free variable through every intermediate function.

mod scope;
mod strict;

#[cfg(test)]
mod tests;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ast::*;
use crate::error::{StaticError, StaticErrors};
use crate::lexer::Position;
use crate::options::FileOptions;

pub use scope::FunctionScope;
pub use strict::IMPLICIT_TUPLE;

/// Resolves all names in `file`, filling in identifier bindings, function
/// information and `file.module`.
pub fn resolve_file(
    file: &mut File,
    is_predeclared: &dyn Fn(&str) -> bool,
    is_universal: &dyn Fn(&str) -> bool,
) -> Result<(), StaticErrors> {
    let mut resolver = Resolver::new(file.options, is_predeclared, is_universal);
    resolver.declare_globals(&file.stmts);
    resolver.block(&mut file.stmts);

    if !resolver.errors.is_empty() {
        return Err(StaticErrors::new(file.path.clone(), resolver.errors));
    }
    debug!(
        path = %file.path,
        globals = resolver.module.globals.len(),
        bindings = resolver.module.bindings.len(),
        "resolved file"
    );
    file.module = Some(resolver.module);
    Ok(())
}

struct Resolver<'a> {
    options: FileOptions,
    is_predeclared: &'a dyn Fn(&str) -> bool,
    is_universal: &'a dyn Fn(&str) -> bool,
    module: ModuleInfo,
    globals: FxHashMap<String, BindingId>,
    predeclared: FxHashMap<String, BindingId>,
    universals: FxHashMap<String, BindingId>,
    /// Enclosing functions, innermost last; empty at toplevel
    functions: Vec<FunctionScope>,
    /// Loop depth of toplevel code
    toplevel_loops: usize,
    errors: Vec<StaticError>,
}

impl<'a> Resolver<'a> {
    fn new(
        options: FileOptions,
        is_predeclared: &'a dyn Fn(&str) -> bool,
        is_universal: &'a dyn Fn(&str) -> bool,
    ) -> Self {
        Self {
            options,
            is_predeclared,
            is_universal,
            module: ModuleInfo::default(),
            globals: FxHashMap::default(),
            predeclared: FxHashMap::default(),
            universals: FxHashMap::default(),
            functions: Vec::new(),
            toplevel_loops: 0,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, pos: Position, msg: impl Into<String>) {
        self.errors.push(StaticError::new(pos, msg));
    }

    fn new_binding(&mut self, scope: Scope, index: usize, name: &str, first: Position) -> BindingId {
        let id = BindingId(self.module.bindings.len() as u32);
        self.module.bindings.push(Binding {
            scope,
            index,
            name: name.to_string(),
            first,
        });
        id
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declares every toplevel binding as a global, in order of first binding.
    fn declare_globals(&mut self, stmts: &[Stmt]) {
        let mut bound = Vec::new();
        collect_bindings(stmts, &mut bound);
        for (name, pos) in bound {
            if let Some(&id) = self.globals.get(&name) {
                if !self.options.global_reassign {
                    let first = self.module.binding(id).first;
                    self.error(pos, format!("cannot reassign global {} declared at {}", name, first));
                }
                continue;
            }
            let index = self.module.globals.len();
            let id = self.new_binding(Scope::Global, index, &name, pos);
            self.module.globals.push(id);
            self.globals.insert(name, id);
        }
    }

    /// Declares the locals of the innermost function: everything bound in
    /// its body that is not already a parameter.
    fn declare_locals(&mut self, body: &[Stmt]) {
        let mut bound = Vec::new();
        collect_bindings(body, &mut bound);
        for (name, pos) in bound {
            self.declare_local(&name, pos);
        }
    }

    fn declare_local(&mut self, name: &str, pos: Position) -> bool {
        let Some(index) = self
            .functions
            .last()
            .filter(|f| !f.is_local(name))
            .map(FunctionScope::local_count)
        else {
            return false;
        };
        let id = self.new_binding(Scope::Local, index, name, pos);
        if let Some(function) = self.functions.last_mut() {
            function.declare(name, id);
        }
        true
    }

    // ========================================================================
    // Uses
    // ========================================================================

    /// Binds an identifier in a binding position. Its binding was declared
    /// ahead of time.
    fn bind(&mut self, id: &mut Ident) {
        let found = match self.functions.last() {
            Some(function) => function.resolve(&id.name),
            None => self.globals.get(&id.name).copied(),
        };
        match found {
            Some(binding) => id.binding = Some(binding),
            None => self.use_ident(id),
        }
    }

    /// Resolves an identifier in a use position.
    fn use_ident(&mut self, id: &mut Ident) {
        let depth = self.functions.len();
        let binding = self
            .lookup_enclosing(depth, &id.name, id.pos)
            .or_else(|| self.globals.get(&id.name).copied())
            .or_else(|| self.lookup_builtin(&id.name, id.pos));
        match binding {
            Some(binding) => id.binding = Some(binding),
            None => self.error(id.pos, format!("undefined: {}", id.name)),
        }
    }

    /// Looks a name up in the function at `depth` (1-based) and its enclosing
    /// functions, threading it as a free variable where needed.
    fn lookup_enclosing(&mut self, depth: usize, name: &str, pos: Position) -> Option<BindingId> {
        if depth == 0 {
            return None;
        }
        if let Some(id) = self.functions[depth - 1].resolve(name) {
            return Some(id);
        }
        let outer = self.lookup_enclosing(depth - 1, name, pos)?;
        let outer_binding = &mut self.module.bindings[outer.0 as usize];
        if outer_binding.scope == Scope::Local {
            outer_binding.scope = Scope::Cell;
        }
        let index = self.functions[depth - 1].free_count();
        let id = self.new_binding(Scope::Free, index, name, pos);
        self.functions[depth - 1].add_free(name, id, outer);
        Some(id)
    }

    fn lookup_builtin(&mut self, name: &str, pos: Position) -> Option<BindingId> {
        if let Some(&id) = self.predeclared.get(name) {
            return Some(id);
        }
        if (self.is_predeclared)(name) {
            let index = self.module.predeclared.len();
            let id = self.new_binding(Scope::Predeclared, index, name, pos);
            self.module.predeclared.push(name.to_string());
            self.predeclared.insert(name.to_string(), id);
            return Some(id);
        }
        if let Some(&id) = self.universals.get(name) {
            return Some(id);
        }
        if (self.is_universal)(name) {
            let index = self.module.universals.len();
            let id = self.new_binding(Scope::Universal, index, name, pos);
            self.module.universals.push(name.to_string());
            self.universals.insert(name.to_string(), id);
            return Some(id);
        }
        None
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn loop_depth(&mut self) -> &mut usize {
        match self.functions.last_mut() {
            Some(function) => &mut function.loop_depth,
            None => &mut self.toplevel_loops,
        }
    }

    fn at_toplevel(&self) -> bool {
        self.functions.is_empty()
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Expr(s) => self.expr(&mut s.expr),
            Stmt::Assign(s) => {
                if self.options.strict_multi_value_return {
                    if let Some(err) = strict::check_implicit_tuple(s) {
                        self.errors.push(err);
                    }
                }
                self.expr(&mut s.rhs);
                if s.op.is_some() {
                    // x op= y reads x before binding it
                    if let Expr::Ident(id) = &mut s.lhs {
                        self.use_ident(id);
                        return;
                    }
                }
                self.assign(&mut s.lhs);
            }
            Stmt::Def(def) => {
                self.bind(&mut def.name);
                let info = self.function(&mut def.params, |r| {
                    r.declare_locals(&def.body);
                    r.block(&mut def.body);
                    if r.options.strict_multi_value_return {
                        if let Some(err) = strict::check_return_counts(&def.body) {
                            r.errors.push(err);
                        }
                    }
                });
                def.function = Some(info);
            }
            Stmt::If(s) => {
                if self.at_toplevel() && !self.options.top_level_control {
                    self.error(s.pos, "if statement not within a function");
                }
                self.expr(&mut s.cond);
                self.block(&mut s.then_body);
                self.block(&mut s.else_body);
            }
            Stmt::For(s) => {
                if self.at_toplevel() && !self.options.top_level_control {
                    self.error(s.pos, "for loop not within a function");
                }
                self.expr(&mut s.iterable);
                self.assign(&mut s.vars);
                *self.loop_depth() += 1;
                self.block(&mut s.body);
                *self.loop_depth() -= 1;
            }
            Stmt::While(s) => {
                if !self.options.while_loops {
                    self.error(s.pos, "while loop not allowed");
                }
                if self.at_toplevel() && !self.options.top_level_control {
                    self.error(s.pos, "while loop not within a function");
                }
                self.expr(&mut s.cond);
                *self.loop_depth() += 1;
                self.block(&mut s.body);
                *self.loop_depth() -= 1;
            }
            Stmt::Branch(s) => {
                let in_loop = *self.loop_depth() > 0;
                match s.kind {
                    BranchKind::Break if !in_loop => self.error(s.pos, "break not in a loop"),
                    BranchKind::Continue if !in_loop => self.error(s.pos, "continue not in a loop"),
                    _ => {}
                }
            }
            Stmt::Return(s) => {
                if self.at_toplevel() {
                    self.error(s.pos, "return statement not within a function");
                }
                if let Some(result) = &mut s.result {
                    self.expr(result);
                }
            }
        }
    }

    /// Resolves an assignment target.
    fn assign(&mut self, lhs: &mut Expr) {
        match lhs {
            Expr::Ident(id) => self.bind(id),
            Expr::Index(index) => {
                self.expr(&mut index.x);
                self.expr(&mut index.index);
            }
            Expr::Tuple(TupleExpr { elems, .. }) | Expr::List(ListExpr { elems, .. }) => {
                for elem in elems {
                    self.assign(elem);
                }
            }
            // rejected by the parser
            other => self.expr(other),
        }
    }

    /// Resolves a function: defaults in the enclosing scope, then parameters
    /// and body in a new scope.
    fn function(&mut self, params: &mut [Param], body: impl FnOnce(&mut Self)) -> FunctionInfo {
        for param in params.iter_mut() {
            if let Param::Optional(_, default) = param {
                self.expr(default);
            }
        }

        self.functions.push(FunctionScope::new());
        for param in params.iter_mut() {
            let ident = param.ident_mut();
            if !self.declare_local(&ident.name, ident.pos) {
                self.error(ident.pos, format!("duplicate parameter: {}", ident.name));
            }
            self.bind(ident);
            if let Some(function) = self.functions.last_mut() {
                match param {
                    Param::Args(_) => function.has_varargs = true,
                    Param::Kwargs(_) => function.has_kwargs = true,
                    _ => {}
                }
            }
        }

        body(self);

        match self.functions.pop() {
            Some(function) => function.into_info(&self.module.bindings),
            None => FunctionInfo::default(),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Ident(id) => self.use_ident(id),
            Expr::Literal(_) => {}
            Expr::Tuple(TupleExpr { elems, .. }) | Expr::List(ListExpr { elems, .. }) => {
                for elem in elems {
                    self.expr(elem);
                }
            }
            Expr::Dict(dict) => {
                for entry in &mut dict.entries {
                    self.expr(&mut entry.key);
                    self.expr(&mut entry.value);
                }
            }
            Expr::Index(index) => {
                self.expr(&mut index.x);
                self.expr(&mut index.index);
            }
            Expr::Call(call) => {
                self.expr(&mut call.func);
                let mut seen = FxHashSet::default();
                for arg in &mut call.args {
                    match arg {
                        Arg::Positional(x) | Arg::Star(x) | Arg::StarStar(x) => self.expr(x),
                        Arg::Named(name, x) => {
                            if !seen.insert(name.name.clone()) {
                                self.error(name.pos, format!("keyword argument {} repeated", name.name));
                            }
                            self.expr(x);
                        }
                    }
                }
            }
            Expr::Unary(unary) => self.expr(&mut unary.x),
            Expr::Binary(binary) => {
                self.expr(&mut binary.x);
                self.expr(&mut binary.y);
            }
            Expr::Cond(cond) => {
                self.expr(&mut cond.cond);
                self.expr(&mut cond.then_expr);
                self.expr(&mut cond.else_expr);
            }
            Expr::Lambda(lambda) => {
                let info = self.function(&mut lambda.params, |r| r.expr(&mut lambda.body));
                lambda.function = Some(info);
            }
        }
    }
}

/// Collects the names bound by statements of one block, in source order,
/// without descending into nested functions.
fn collect_bindings(stmts: &[Stmt], out: &mut Vec<(String, Position)>) {
    for stmt in stmts {
        match stmt {
            Stmt::Assign(s) => collect_target(&s.lhs, out),
            Stmt::Def(def) => out.push((def.name.name.clone(), def.name.pos)),
            Stmt::If(s) => {
                collect_bindings(&s.then_body, out);
                collect_bindings(&s.else_body, out);
            }
            Stmt::For(s) => {
                collect_target(&s.vars, out);
                collect_bindings(&s.body, out);
            }
            Stmt::While(s) => collect_bindings(&s.body, out),
            Stmt::Expr(_) | Stmt::Branch(_) | Stmt::Return(_) => {}
        }
    }
}

fn collect_target(target: &Expr, out: &mut Vec<(String, Position)>) {
    match target {
        Expr::Ident(id) => out.push((id.name.clone(), id.pos)),
        Expr::Tuple(TupleExpr { elems, .. }) | Expr::List(ListExpr { elems, .. }) => {
            for elem in elems {
                collect_target(elem, out);
            }
        }
        _ => {}
    }
}
