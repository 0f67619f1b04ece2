//! Code generation from a resolved AST to bytecode.
//!
//! This module contains the `Compiler` which transforms a resolved [`File`]
//! into a [`Program`]. Each function body is compiled into its own
//! [`Funcode`]; nested functions are compiled when their `def` or `lambda`
//! is reached and referenced from the enclosing code by index.

#[cfg(test)]
mod tests;

// Documentation and test submodules
pub mod expressions;
pub mod statements;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::*;
use crate::compiler::bytecode::{
    call_arg, Capture, Constant, FreeVar, Funcode, Instruction, LineEntry, Named, OpCode, Program,
};
use crate::error::{StaticError, StaticErrors};
use crate::lexer::{IntLiteral, Position};

type CompileResult<T> = std::result::Result<T, StaticError>;

/// Compiles a resolved file into a program.
pub fn compile_file(file: &File) -> Result<Program, StaticErrors> {
    let Some(module) = file.module.as_ref() else {
        return Err(StaticErrors::single(
            file.path.clone(),
            StaticError::new(Position::new(1, 1), "file has not been resolved"),
        ));
    };
    let mut compiler = Compiler::new(module);
    compiler
        .compile(file)
        .map_err(|err| StaticErrors::single(file.path.clone(), err))
}

/// Jump targets of an enclosing loop.
struct LoopLabels {
    /// Where `continue` jumps
    continue_target: usize,
    /// `break` jumps awaiting the loop end
    breaks: Vec<usize>,
}

/// Per-function emission state.
#[derive(Default)]
struct FunctionBuilder {
    code: Vec<Instruction>,
    lines: Vec<LineEntry>,
    depth: i64,
    max_depth: i64,
    loops: Vec<LoopLabels>,
}

impl FunctionBuilder {
    fn emit(&mut self, instruction: Instruction) -> usize {
        self.depth += stack_effect(instruction);
        self.max_depth = self.max_depth.max(self.depth);
        let index = self.code.len();
        self.code.push(instruction);
        index
    }

    /// Records `pos` as the position of the next instruction.
    fn set_pos(&mut self, pos: Position) {
        let pc = self.code.len() as u32;
        if let Some(last) = self.lines.last_mut() {
            if last.pos == pos {
                return;
            }
            if last.pc == pc {
                last.pos = pos;
                return;
            }
        }
        self.lines.push(LineEntry { pc, pos });
    }

    fn here(&self) -> usize {
        self.code.len()
    }

    fn patch(&mut self, at: usize, target: usize) {
        self.code[at].arg = target as u32;
    }
}

/// Net operand stack change of an instruction.
fn stack_effect(instruction: Instruction) -> i64 {
    let arg = i64::from(instruction.arg);
    match instruction.opcode {
        OpCode::Nop | OpCode::Exch | OpCode::Jump | OpCode::IterPop => 0,
        OpCode::UPlus | OpCode::UMinus | OpCode::UTilde | OpCode::Not => 0,
        OpCode::MakeFunc => 0,
        OpCode::Dup => 1,
        OpCode::Dup2 => 2,
        OpCode::Pop | OpCode::Return => -1,
        OpCode::None | OpCode::True | OpCode::False | OpCode::Constant => 1,
        OpCode::Local
        | OpCode::LocalCell
        | OpCode::Free
        | OpCode::Global
        | OpCode::Predeclared
        | OpCode::Universal => 1,
        OpCode::SetLocal | OpCode::SetLocalCell | OpCode::SetGlobal => -1,
        OpCode::Eql
        | OpCode::Neq
        | OpCode::Lt
        | OpCode::Le
        | OpCode::Gt
        | OpCode::Ge
        | OpCode::In
        | OpCode::Pipe
        | OpCode::Caret
        | OpCode::Amp
        | OpCode::Shl
        | OpCode::Shr
        | OpCode::Plus
        | OpCode::Minus
        | OpCode::Star
        | OpCode::Slash
        | OpCode::SlashSlash
        | OpCode::Percent
        | OpCode::InplacePlus
        | OpCode::Index => -1,
        OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::IterPush => -1,
        // the element is pushed only on fall-through
        OpCode::IterJmp => 1,
        OpCode::MakeTuple | OpCode::MakeList => 1 - arg,
        OpCode::MakeDict => 1,
        OpCode::SetDictUnique | OpCode::SetIndex => -3,
        OpCode::Unpack => arg - 1,
        OpCode::Call | OpCode::CallVar | OpCode::CallKw | OpCode::CallVarKw => {
            let positional = arg >> 8;
            let named = arg & 0xff;
            let extra = match instruction.opcode {
                OpCode::CallVar | OpCode::CallKw => 1,
                OpCode::CallVarKw => 2,
                _ => 0,
            };
            -(positional + 2 * named + extra)
        }
    }
}

/// Compiles a resolved AST to bytecode.
pub struct Compiler<'a> {
    module: &'a ModuleInfo,
    constants: Vec<Constant>,
    constant_index: FxHashMap<Constant, u32>,
    /// Reserved function slots, filled when each function is finished
    functions: Vec<Option<Funcode>>,
    /// The function currently being emitted
    builder: FunctionBuilder,
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler for a resolved module.
    pub fn new(module: &'a ModuleInfo) -> Self {
        Self {
            module,
            constants: Vec::new(),
            constant_index: FxHashMap::default(),
            functions: Vec::new(),
            builder: FunctionBuilder::default(),
        }
    }

    /// Compiles the file's toplevel statements and every nested function.
    pub fn compile(&mut self, file: &File) -> CompileResult<Program> {
        self.functions.push(None);
        for stmt in &file.stmts {
            self.compile_statement(stmt)?;
        }
        self.emit(Instruction::simple(OpCode::None));
        self.emit(Instruction::simple(OpCode::Return));

        let builder = std::mem::take(&mut self.builder);
        let toplevel = self.finish_function(
            builder,
            "<toplevel>".to_string(),
            Position::new(1, 1),
            None,
            &[],
            &self.module.toplevel,
        );
        self.functions[0] = Some(toplevel);

        let functions: Vec<Funcode> = std::mem::take(&mut self.functions)
            .into_iter()
            .map(|f| f.ok_or_else(|| StaticError::new(Position::new(1, 1), "function was never finished")))
            .collect::<CompileResult<_>>()?;

        let globals = self
            .module
            .globals
            .iter()
            .map(|&id| {
                let binding = self.module.binding(id);
                Named {
                    name: binding.name.clone(),
                    pos: binding.first,
                }
            })
            .collect();

        let program = Program {
            filename: Arc::from(file.path.as_str()),
            options: file.options,
            constants: std::mem::take(&mut self.constants),
            functions,
            globals,
            predeclared: self.module.predeclared.clone(),
            universals: self.module.universals.clone(),
        };
        debug!(
            path = %file.path,
            functions = program.functions.len(),
            constants = program.constants.len(),
            "compiled program"
        );
        Ok(program)
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Compiles a nested function and emits the code that creates it.
    fn compile_function(
        &mut self,
        name: &str,
        pos: Position,
        doc: Option<String>,
        params: &[Param],
        info: Option<&FunctionInfo>,
        body: FunctionBody<'_>,
    ) -> CompileResult<()> {
        let info = info.ok_or_else(|| StaticError::new(pos, format!("function {} has not been resolved", name)))?;

        // Defaults are evaluated in the enclosing function, at definition time.
        let mut num_defaults = 0;
        for param in params {
            if let Param::Optional(_, default) = param {
                self.compile_expression(default)?;
                num_defaults += 1;
            }
        }
        self.emit(Instruction::with_operand(OpCode::MakeTuple, num_defaults));

        let index = self.functions.len();
        self.functions.push(None);

        let outer = std::mem::take(&mut self.builder);
        let result = match body {
            FunctionBody::Block(stmts) => stmts.iter().try_for_each(|stmt| self.compile_statement(stmt)),
            FunctionBody::Expr(expr) => self.compile_expression(expr).map(|_| {
                self.emit(Instruction::simple(OpCode::Return));
            }),
        };
        let inner = std::mem::replace(&mut self.builder, outer);
        result?;

        let mut inner = inner;
        inner.emit(Instruction::simple(OpCode::None));
        inner.emit(Instruction::simple(OpCode::Return));
        let funcode = self.finish_function(inner, name.to_string(), pos, doc, params, info);
        self.functions[index] = Some(funcode);

        self.builder.set_pos(pos);
        self.emit(Instruction::with_operand(OpCode::MakeFunc, index as u32));
        Ok(())
    }

    fn finish_function(
        &self,
        builder: FunctionBuilder,
        name: String,
        pos: Position,
        doc: Option<String>,
        params: &[Param],
        info: &FunctionInfo,
    ) -> Funcode {
        let named = |id: &BindingId| {
            let binding = self.module.binding(*id);
            Named {
                name: binding.name.clone(),
                pos: binding.first,
            }
        };
        let freevars = info
            .freevars
            .iter()
            .map(|id| {
                let binding = self.module.binding(*id);
                let source = match binding.scope {
                    Scope::Free => Capture::Free(binding.index as u32),
                    _ => Capture::Cell(binding.index as u32),
                };
                FreeVar {
                    name: binding.name.clone(),
                    pos: binding.first,
                    source,
                }
            })
            .collect();
        Funcode {
            name,
            pos,
            doc,
            num_params: params.len(),
            num_defaults: params.iter().filter(|p| matches!(p, Param::Optional(..))).count(),
            has_varargs: info.has_varargs,
            has_kwargs: info.has_kwargs,
            locals: info.locals.iter().map(named).collect(),
            cells: info.cells.clone(),
            freevars,
            code: builder.code,
            lines: builder.lines,
            max_stack: builder.max_depth.max(0) as usize,
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.builder.set_pos(stmt.pos());
        match stmt {
            Stmt::Expr(s) => {
                self.compile_expression(&s.expr)?;
                self.emit(Instruction::simple(OpCode::Pop));
            }
            Stmt::Assign(s) => self.compile_assign(s)?,
            Stmt::Def(def) => {
                self.compile_function(
                    &def.name.name,
                    def.pos,
                    def.doc.clone(),
                    &def.params,
                    def.function.as_ref(),
                    FunctionBody::Block(&def.body),
                )?;
                self.compile_store(&def.name)?;
            }
            Stmt::If(s) => self.compile_if_statement(s)?,
            Stmt::For(s) => self.compile_for_statement(s)?,
            Stmt::While(s) => self.compile_while_statement(s)?,
            Stmt::Branch(s) => self.compile_branch(s)?,
            Stmt::Return(s) => {
                match &s.result {
                    Some(result) => self.compile_expression(result)?,
                    None => {
                        self.emit(Instruction::simple(OpCode::None));
                    }
                }
                self.builder.set_pos(s.pos);
                self.emit(Instruction::simple(OpCode::Return));
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, assign: &AssignStmt) -> CompileResult<()> {
        let Some(op) = assign.op else {
            self.compile_expression(&assign.rhs)?;
            return self.compile_assign_target(&assign.lhs);
        };

        let opcode = if op == BinaryOp::Plus {
            OpCode::InplacePlus
        } else {
            binary_opcode(op)
        };
        match &assign.lhs {
            Expr::Ident(id) => {
                self.compile_identifier(id)?;
                self.compile_expression(&assign.rhs)?;
                self.builder.set_pos(assign.op_pos);
                self.emit(Instruction::simple(opcode));
                self.compile_store(id)
            }
            Expr::Index(index) => {
                // x y -> x y x[y] -> x y (x[y] op rhs) -> x[y] = ...
                self.compile_expression(&index.x)?;
                self.compile_expression(&index.index)?;
                self.emit(Instruction::simple(OpCode::Dup2));
                self.builder.set_pos(index.lbrack);
                self.emit(Instruction::simple(OpCode::Index));
                self.compile_expression(&assign.rhs)?;
                self.builder.set_pos(assign.op_pos);
                self.emit(Instruction::simple(opcode));
                self.emit(Instruction::simple(OpCode::SetIndex));
                Ok(())
            }
            other => Err(StaticError::new(other.pos(), "invalid augmented assignment target")),
        }
    }

    /// Stores the value on top of the stack into a target.
    fn compile_assign_target(&mut self, lhs: &Expr) -> CompileResult<()> {
        match lhs {
            Expr::Ident(id) => self.compile_store(id),
            Expr::Index(index) => {
                // v -> x v -> x y v
                self.compile_expression(&index.x)?;
                self.emit(Instruction::simple(OpCode::Exch));
                self.compile_expression(&index.index)?;
                self.emit(Instruction::simple(OpCode::Exch));
                self.builder.set_pos(index.lbrack);
                self.emit(Instruction::simple(OpCode::SetIndex));
                Ok(())
            }
            Expr::Tuple(TupleExpr { elems, .. }) | Expr::List(ListExpr { elems, .. }) => {
                self.builder.set_pos(lhs.pos());
                self.emit(Instruction::with_operand(OpCode::Unpack, elems.len() as u32));
                for elem in elems {
                    self.compile_assign_target(elem)?;
                }
                Ok(())
            }
            other => Err(StaticError::new(other.pos(), "invalid assignment target")),
        }
    }

    fn compile_if_statement(&mut self, s: &IfStmt) -> CompileResult<()> {
        self.compile_expression(&s.cond)?;
        let jump_to_else = self.emit(Instruction::with_operand(OpCode::JumpIfFalse, 0));
        for stmt in &s.then_body {
            self.compile_statement(stmt)?;
        }
        if s.else_body.is_empty() {
            let end = self.builder.here();
            self.builder.patch(jump_to_else, end);
            return Ok(());
        }
        let jump_to_end = self.emit(Instruction::with_operand(OpCode::Jump, 0));
        let else_pos = self.builder.here();
        self.builder.patch(jump_to_else, else_pos);
        for stmt in &s.else_body {
            self.compile_statement(stmt)?;
        }
        let end = self.builder.here();
        self.builder.patch(jump_to_end, end);
        Ok(())
    }

    fn compile_for_statement(&mut self, s: &ForStmt) -> CompileResult<()> {
        self.compile_expression(&s.iterable)?;
        self.builder.set_pos(s.pos);
        self.emit(Instruction::simple(OpCode::IterPush));
        let loop_start = self.emit(Instruction::with_operand(OpCode::IterJmp, 0));
        self.compile_assign_target(&s.vars)?;

        self.builder.loops.push(LoopLabels {
            continue_target: loop_start,
            breaks: Vec::new(),
        });
        for stmt in &s.body {
            self.compile_statement(stmt)?;
        }
        let labels = self.builder.loops.pop();

        self.builder.set_pos(s.pos);
        self.emit(Instruction::with_operand(OpCode::Jump, loop_start as u32));
        let end = self.builder.here();
        self.builder.patch(loop_start, end);
        for at in labels.map(|l| l.breaks).unwrap_or_default() {
            self.builder.patch(at, end);
        }
        self.emit(Instruction::simple(OpCode::IterPop));
        Ok(())
    }

    fn compile_while_statement(&mut self, s: &WhileStmt) -> CompileResult<()> {
        let loop_start = self.builder.here();
        self.compile_expression(&s.cond)?;
        let jump_to_end = self.emit(Instruction::with_operand(OpCode::JumpIfFalse, 0));

        self.builder.loops.push(LoopLabels {
            continue_target: loop_start,
            breaks: Vec::new(),
        });
        for stmt in &s.body {
            self.compile_statement(stmt)?;
        }
        let labels = self.builder.loops.pop();

        self.builder.set_pos(s.pos);
        self.emit(Instruction::with_operand(OpCode::Jump, loop_start as u32));
        let end = self.builder.here();
        self.builder.patch(jump_to_end, end);
        for at in labels.map(|l| l.breaks).unwrap_or_default() {
            self.builder.patch(at, end);
        }
        Ok(())
    }

    fn compile_branch(&mut self, s: &BranchStmt) -> CompileResult<()> {
        match s.kind {
            BranchKind::Pass => Ok(()),
            BranchKind::Break => {
                let at = self.emit(Instruction::with_operand(OpCode::Jump, 0));
                match self.builder.loops.last_mut() {
                    Some(labels) => {
                        labels.breaks.push(at);
                        Ok(())
                    }
                    None => Err(StaticError::new(s.pos, "break not in a loop")),
                }
            }
            BranchKind::Continue => match self.builder.loops.last() {
                Some(labels) => {
                    let target = labels.continue_target as u32;
                    self.emit(Instruction::with_operand(OpCode::Jump, target));
                    Ok(())
                }
                None => Err(StaticError::new(s.pos, "continue not in a loop")),
            },
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Ident(id) => self.compile_identifier(id)?,
            Expr::Literal(lit) => {
                let constant = match &lit.value {
                    LiteralValue::Int(IntLiteral::Small(i)) => Constant::Int(*i),
                    LiteralValue::Int(IntLiteral::Big(i)) => Constant::BigInt(i.clone()),
                    LiteralValue::Float(f) => Constant::Float(*f),
                    LiteralValue::String(s) => Constant::String(s.clone()),
                    LiteralValue::Bytes(b) => Constant::Bytes(b.clone()),
                };
                let index = self.add_constant(constant);
                self.emit(Instruction::with_operand(OpCode::Constant, index));
            }
            Expr::Tuple(t) => {
                for elem in &t.elems {
                    self.compile_expression(elem)?;
                }
                self.emit(Instruction::with_operand(OpCode::MakeTuple, t.elems.len() as u32));
            }
            Expr::List(l) => {
                for elem in &l.elems {
                    self.compile_expression(elem)?;
                }
                self.emit(Instruction::with_operand(OpCode::MakeList, l.elems.len() as u32));
            }
            Expr::Dict(d) => {
                self.emit(Instruction::simple(OpCode::MakeDict));
                for entry in &d.entries {
                    self.emit(Instruction::simple(OpCode::Dup));
                    self.compile_expression(&entry.key)?;
                    self.compile_expression(&entry.value)?;
                    self.builder.set_pos(entry.colon);
                    self.emit(Instruction::simple(OpCode::SetDictUnique));
                }
            }
            Expr::Index(index) => {
                self.compile_expression(&index.x)?;
                self.compile_expression(&index.index)?;
                self.builder.set_pos(index.lbrack);
                self.emit(Instruction::simple(OpCode::Index));
            }
            Expr::Call(call) => self.compile_call(call)?,
            Expr::Unary(unary) => {
                self.compile_expression(&unary.x)?;
                self.builder.set_pos(unary.op_pos);
                let opcode = match unary.op {
                    UnaryOp::Plus => OpCode::UPlus,
                    UnaryOp::Minus => OpCode::UMinus,
                    UnaryOp::Tilde => OpCode::UTilde,
                    UnaryOp::Not => OpCode::Not,
                };
                self.emit(Instruction::simple(opcode));
            }
            Expr::Binary(binary) => self.compile_binary(binary)?,
            Expr::Cond(cond) => {
                self.compile_expression(&cond.cond)?;
                let jump_to_else = self.emit(Instruction::with_operand(OpCode::JumpIfFalse, 0));
                self.compile_expression(&cond.then_expr)?;
                let jump_to_end = self.emit(Instruction::with_operand(OpCode::Jump, 0));
                // only one branch's value is ever on the stack
                self.builder.depth -= 1;
                let else_pos = self.builder.here();
                self.builder.patch(jump_to_else, else_pos);
                self.compile_expression(&cond.else_expr)?;
                let end = self.builder.here();
                self.builder.patch(jump_to_end, end);
            }
            Expr::Lambda(lambda) => {
                self.compile_function(
                    "lambda",
                    lambda.pos,
                    None,
                    &lambda.params,
                    lambda.function.as_ref(),
                    FunctionBody::Expr(&lambda.body),
                )?;
            }
        }
        Ok(())
    }

    fn compile_binary(&mut self, binary: &BinaryExpr) -> CompileResult<()> {
        match binary.op {
            BinaryOp::And | BinaryOp::Or => {
                self.compile_expression(&binary.x)?;
                self.emit(Instruction::simple(OpCode::Dup));
                let short_circuit = if binary.op == BinaryOp::And {
                    OpCode::JumpIfFalse
                } else {
                    OpCode::JumpIfTrue
                };
                let jump_to_end = self.emit(Instruction::with_operand(short_circuit, 0));
                self.emit(Instruction::simple(OpCode::Pop));
                self.compile_expression(&binary.y)?;
                let end = self.builder.here();
                self.builder.patch(jump_to_end, end);
            }
            BinaryOp::NotIn => {
                self.compile_expression(&binary.x)?;
                self.compile_expression(&binary.y)?;
                self.builder.set_pos(binary.op_pos);
                self.emit(Instruction::simple(OpCode::In));
                self.emit(Instruction::simple(OpCode::Not));
            }
            op => {
                self.compile_expression(&binary.x)?;
                self.compile_expression(&binary.y)?;
                self.builder.set_pos(binary.op_pos);
                self.emit(Instruction::simple(binary_opcode(op)));
            }
        }
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpr) -> CompileResult<()> {
        self.compile_expression(&call.func)?;
        let mut positional = 0usize;
        let mut named = 0usize;
        let mut varargs: Option<&Expr> = None;
        let mut kwargs: Option<&Expr> = None;
        for arg in &call.args {
            match arg {
                Arg::Positional(x) => {
                    self.compile_expression(x)?;
                    positional += 1;
                }
                Arg::Named(name, x) => {
                    let index = self.add_constant(Constant::String(name.name.clone()));
                    self.emit(Instruction::with_operand(OpCode::Constant, index));
                    self.compile_expression(x)?;
                    named += 1;
                }
                Arg::Star(x) => varargs = Some(x),
                Arg::StarStar(x) => kwargs = Some(x),
            }
        }
        if positional >= 1 << 24 || named > 0xff {
            return Err(StaticError::new(call.lparen, "too many arguments in call"));
        }
        if let Some(x) = varargs {
            self.compile_expression(x)?;
        }
        if let Some(x) = kwargs {
            self.compile_expression(x)?;
        }
        let opcode = match (varargs.is_some(), kwargs.is_some()) {
            (false, false) => OpCode::Call,
            (true, false) => OpCode::CallVar,
            (false, true) => OpCode::CallKw,
            (true, true) => OpCode::CallVarKw,
        };
        self.builder.set_pos(call.lparen);
        self.emit(Instruction::with_operand(opcode, call_arg(positional, named)));
        Ok(())
    }

    fn binding(&self, id: &Ident) -> CompileResult<&'a Binding> {
        let module = self.module;
        id.binding
            .map(|b| module.binding(b))
            .ok_or_else(|| StaticError::new(id.pos, format!("unresolved identifier: {}", id.name)))
    }

    fn compile_identifier(&mut self, id: &Ident) -> CompileResult<()> {
        let binding = self.binding(id)?;
        let opcode = match binding.scope {
            Scope::Local => OpCode::Local,
            Scope::Cell => OpCode::LocalCell,
            Scope::Free => OpCode::Free,
            Scope::Global => OpCode::Global,
            Scope::Predeclared => OpCode::Predeclared,
            Scope::Universal => OpCode::Universal,
        };
        self.builder.set_pos(id.pos);
        self.emit(Instruction::with_operand(opcode, binding.index as u32));
        Ok(())
    }

    fn compile_store(&mut self, id: &Ident) -> CompileResult<()> {
        let binding = self.binding(id)?;
        let opcode = match binding.scope {
            Scope::Local => OpCode::SetLocal,
            Scope::Cell => OpCode::SetLocalCell,
            Scope::Global => OpCode::SetGlobal,
            scope => {
                return Err(StaticError::new(
                    id.pos,
                    format!("cannot assign to {} variable {}", scope, id.name),
                ))
            }
        };
        self.emit(Instruction::with_operand(opcode, binding.index as u32));
        Ok(())
    }

    // ========================================================================
    // Utilities
    // ========================================================================

    /// Interns a constant, returning its pool index.
    fn add_constant(&mut self, constant: Constant) -> u32 {
        if let Some(&index) = self.constant_index.get(&constant) {
            return index;
        }
        let index = self.constants.len() as u32;
        self.constants.push(constant.clone());
        self.constant_index.insert(constant, index);
        index
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.builder.emit(instruction)
    }
}

/// The body of a function being compiled.
enum FunctionBody<'b> {
    /// Statements of a `def`
    Block(&'b [Stmt]),
    /// Expression of a `lambda`
    Expr(&'b Expr),
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Eq => OpCode::Eql,
        BinaryOp::Ne => OpCode::Neq,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Le => OpCode::Le,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Ge => OpCode::Ge,
        BinaryOp::In | BinaryOp::NotIn => OpCode::In,
        BinaryOp::Pipe => OpCode::Pipe,
        BinaryOp::Caret => OpCode::Caret,
        BinaryOp::Amp => OpCode::Amp,
        BinaryOp::Shl => OpCode::Shl,
        BinaryOp::Shr => OpCode::Shr,
        BinaryOp::Plus => OpCode::Plus,
        BinaryOp::Minus => OpCode::Minus,
        BinaryOp::Star => OpCode::Star,
        BinaryOp::Slash => OpCode::Slash,
        BinaryOp::SlashSlash => OpCode::SlashSlash,
        BinaryOp::Percent => OpCode::Percent,
        // short-circuit operators are compiled as jumps
        BinaryOp::And | BinaryOp::Or => OpCode::Nop,
    }
}
