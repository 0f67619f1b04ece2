//! The bytecode interpreter.
//!
//! Frames live on the thread rather than on the native stack, so deeply
//! nested calls cost heap, not Rust stack. A failing instruction unwinds
//! every frame pushed by the current call and reports the call stack as it
//! was at the point of failure.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::trace;

use super::thread::{CancelHandle, Thread};
use crate::ast::{BinaryOp, UnaryOp};
use crate::compiler::bytecode::split_call_arg;
use crate::compiler::{Capture, OpCode};
use crate::error::{CallFrame, EvalError};
use crate::lexer::Position;
use crate::runtime::dict::Dict;
use crate::runtime::function::{Arguments, Cell, Function, new_cell};
use crate::runtime::ops;
use crate::runtime::value::Value;

/// Deepest call nesting a thread may reach.
const MAX_DEPTH: usize = 10_000;

/// A local variable slot.
enum Slot {
    Unbound,
    Bound(Value),
    /// Shared with nested functions
    Cell(Cell),
}

/// An activation record.
pub(crate) struct Frame {
    function: Arc<Function>,
    pc: usize,
    stack: Vec<Value>,
    locals: Vec<Slot>,
    iterators: Vec<std::vec::IntoIter<Value>>,
}

impl Frame {
    fn new(function: Arc<Function>, locals: Vec<Slot>) -> Self {
        let capacity = function.funcode().max_stack.min(256);
        Self {
            function,
            pc: 0,
            stack: Vec::with_capacity(capacity),
            locals,
            iterators: Vec::new(),
        }
    }

    /// Position of the instruction being executed, or of the definition
    /// before the first one is fetched.
    fn position(&self) -> Position {
        let fc = self.function.funcode();
        match self.pc {
            0 => fc.pos,
            pc => fc.position(pc - 1),
        }
    }

    pub(crate) fn call_frame(&self) -> CallFrame {
        CallFrame {
            name: self.function.name().to_string(),
            path: self.function.module.program.filename.clone(),
            pos: self.position(),
        }
    }

    fn pop(&mut self) -> Result<Value, String> {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    fn top(&self) -> Result<&Value, String> {
        self.stack.last().ok_or_else(stack_underflow)
    }

    /// Removes the top `n` operands, preserving their order.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, String> {
        let at = self.stack.len().checked_sub(n).ok_or_else(stack_underflow)?;
        Ok(self.stack.split_off(at))
    }

    fn load_local(&self, index: usize) -> Result<Value, String> {
        let value = match &self.locals[index] {
            Slot::Bound(v) => Some(v.clone()),
            Slot::Cell(c) => c.lock().clone(),
            Slot::Unbound => None,
        };
        value.ok_or_else(|| {
            let name = &self.function.funcode().locals[index].name;
            format!("local variable {} referenced before assignment", name)
        })
    }

    fn store_local(&mut self, index: usize, value: Value) {
        if let Slot::Cell(c) = &self.locals[index] {
            *c.lock() = Some(value);
        } else {
            self.locals[index] = Slot::Bound(value);
        }
    }
}

fn stack_underflow() -> String {
    "internal error: operand stack underflow".to_string()
}

/// Fails if the thread was cancelled or has exhausted its step budget.
fn safe_point(cancel: &CancelHandle, steps: u64, max_steps: u64) -> Result<(), String> {
    if let Some(reason) = cancel.reason() {
        return Err(format!("computation cancelled: {}", reason));
    }
    if max_steps != 0 && steps > max_steps {
        return Err("computation cancelled: too many steps".to_string());
    }
    Ok(())
}

/// Calls `function` with `args` on `thread` and runs it to completion.
pub(crate) fn call(thread: &mut Thread, function: Arc<Function>, args: Arguments) -> Result<Value, EvalError> {
    let base = thread.frames.len();
    let entered = bind_arguments(&function, args).and_then(|locals| {
        if base >= MAX_DEPTH {
            return Err("call stack depth exceeded".to_string());
        }
        trace!(function = function.name(), depth = base + 1, "push frame");
        thread.frames.push(Frame::new(function, locals));
        run(thread, base)
    });
    entered.map_err(|msg| {
        let error = EvalError::new(msg, thread.call_stack());
        thread.frames.truncate(base);
        error
    })
}

/// Executes instructions until the frame at `base` returns.
fn run(thread: &mut Thread, base: usize) -> Result<Value, String> {
    loop {
        let Some(frame) = thread.frames.last_mut() else {
            return Err("internal error: no active frame".to_string());
        };
        let Some(&insn) = frame.function.funcode().code.get(frame.pc) else {
            return Err(format!("internal error: pc {} out of range", frame.pc));
        };
        frame.pc += 1;
        thread.steps += 1;
        let arg = insn.arg as usize;

        match insn.opcode {
            OpCode::Nop => {}
            OpCode::Dup => {
                let x = frame.top()?.clone();
                frame.stack.push(x);
            }
            OpCode::Dup2 => {
                let n = frame.stack.len();
                if n < 2 {
                    return Err(stack_underflow());
                }
                frame.stack.extend_from_within(n - 2..);
            }
            OpCode::Pop => {
                frame.pop()?;
            }
            OpCode::Exch => {
                let n = frame.stack.len();
                if n < 2 {
                    return Err(stack_underflow());
                }
                frame.stack.swap(n - 2, n - 1);
            }

            OpCode::None => frame.stack.push(Value::None),
            OpCode::True => frame.stack.push(Value::Bool(true)),
            OpCode::False => frame.stack.push(Value::Bool(false)),
            OpCode::Constant => {
                let c = frame.function.module.constants[arg].clone();
                frame.stack.push(c);
            }

            OpCode::Local | OpCode::LocalCell => {
                let v = frame.load_local(arg)?;
                frame.stack.push(v);
            }
            OpCode::SetLocal | OpCode::SetLocalCell => {
                let v = frame.pop()?;
                frame.store_local(arg, v);
            }
            OpCode::Free => {
                let v = frame.function.freevars[arg].lock().clone();
                match v {
                    Some(v) => frame.stack.push(v),
                    None => {
                        let name = &frame.function.funcode().freevars[arg].name;
                        return Err(format!("local variable {} referenced before assignment", name));
                    }
                }
            }
            OpCode::Global => {
                let v = frame.function.module.globals.lock()[arg].clone();
                match v {
                    Some(v) => frame.stack.push(v),
                    None => {
                        let name = &frame.function.module.program.globals[arg].name;
                        return Err(format!("global variable {} referenced before assignment", name));
                    }
                }
            }
            OpCode::SetGlobal => {
                let v = frame.pop()?;
                frame.function.module.globals.lock()[arg] = Some(v);
            }
            OpCode::Predeclared => {
                let v = frame.function.module.predeclared[arg].clone();
                frame.stack.push(v);
            }
            OpCode::Universal => {
                let v = frame.function.module.universals[arg].clone();
                frame.stack.push(v);
            }

            OpCode::UPlus | OpCode::UMinus | OpCode::UTilde | OpCode::Not => {
                let op = match insn.opcode {
                    OpCode::UPlus => UnaryOp::Plus,
                    OpCode::UMinus => UnaryOp::Minus,
                    OpCode::UTilde => UnaryOp::Tilde,
                    _ => UnaryOp::Not,
                };
                let x = frame.pop()?;
                let z = ops::unary(op, &x)?;
                frame.stack.push(z);
            }
            OpCode::InplacePlus => {
                let y = frame.pop()?;
                let x = frame.pop()?;
                let z = ops::inplace_plus(&x, &y)?;
                frame.stack.push(z);
            }
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
            | OpCode::Percent => {
                let y = frame.pop()?;
                let x = frame.pop()?;
                let z = ops::binary(binary_op(insn.opcode), &x, &y)?;
                frame.stack.push(z);
            }

            OpCode::Jump => {
                safe_point(&thread.cancel, thread.steps, thread.max_steps)?;
                frame.pc = arg;
            }
            OpCode::JumpIfFalse | OpCode::JumpIfTrue => {
                safe_point(&thread.cancel, thread.steps, thread.max_steps)?;
                let cond = frame.pop()?;
                if cond.truth() == (insn.opcode == OpCode::JumpIfTrue) {
                    frame.pc = arg;
                }
            }
            OpCode::IterPush => {
                let x = frame.pop()?;
                let elems = x.iterate()?;
                frame.iterators.push(elems.into_iter());
            }
            OpCode::IterJmp => {
                safe_point(&thread.cancel, thread.steps, thread.max_steps)?;
                let Some(iter) = frame.iterators.last_mut() else {
                    return Err("internal error: no active loop".to_string());
                };
                match iter.next() {
                    Some(x) => frame.stack.push(x),
                    None => frame.pc = arg,
                }
            }
            OpCode::IterPop => {
                frame.iterators.pop();
            }

            OpCode::MakeTuple => {
                let elems = frame.pop_n(arg)?;
                frame.stack.push(Value::new_tuple(elems));
            }
            OpCode::MakeList => {
                let elems = frame.pop_n(arg)?;
                frame.stack.push(Value::new_list(elems));
            }
            OpCode::MakeDict => frame.stack.push(Value::Dict(Arc::new(Dict::new()))),
            OpCode::SetDictUnique => {
                let v = frame.pop()?;
                let k = frame.pop()?;
                match frame.pop()? {
                    Value::Dict(d) => d.insert_unique(k, v)?,
                    other => return Err(format!("internal error: dict literal built on {}", other.type_name())),
                }
            }
            OpCode::Index => {
                let y = frame.pop()?;
                let x = frame.pop()?;
                let z = ops::index(&x, &y)?;
                frame.stack.push(z);
            }
            OpCode::SetIndex => {
                let v = frame.pop()?;
                let y = frame.pop()?;
                let x = frame.pop()?;
                ops::set_index(&x, &y, v)?;
            }
            OpCode::Unpack => {
                let x = frame.pop()?;
                let elems = x
                    .iterate()
                    .map_err(|_| format!("got {} in sequence assignment", x.type_name()))?;
                if elems.len() > arg {
                    return Err(format!("too many values to unpack (got {}, want {})", elems.len(), arg));
                }
                if elems.len() < arg {
                    return Err(format!("too few values to unpack (got {}, want {})", elems.len(), arg));
                }
                frame.stack.extend(elems.into_iter().rev());
            }

            OpCode::MakeFunc => {
                let defaults = match frame.pop()? {
                    Value::Tuple(t) => t.to_vec(),
                    other => return Err(format!("internal error: defaults are {}", other.type_name())),
                };
                let module = frame.function.module.clone();
                let mut freevars = Vec::new();
                for fv in &module.program.functions[arg].freevars {
                    let cell = match fv.source {
                        Capture::Cell(slot) => match &frame.locals[slot as usize] {
                            Slot::Cell(c) => c.clone(),
                            _ => return Err(format!("internal error: {} is not a cell", fv.name)),
                        },
                        Capture::Free(i) => frame.function.freevars[i as usize].clone(),
                    };
                    freevars.push(cell);
                }
                let closure = Function {
                    module,
                    index: arg,
                    defaults,
                    freevars,
                    frozen: AtomicBool::new(false),
                };
                frame.stack.push(Value::Function(Arc::new(closure)));
            }

            OpCode::Call | OpCode::CallVar | OpCode::CallKw | OpCode::CallVarKw => {
                safe_point(&thread.cancel, thread.steps, thread.max_steps)?;
                let (npos, nnamed) = split_call_arg(insn.arg);
                let kwargs = match insn.opcode {
                    OpCode::CallKw | OpCode::CallVarKw => Some(frame.pop()?),
                    _ => None,
                };
                let varargs = match insn.opcode {
                    OpCode::CallVar | OpCode::CallVarKw => Some(frame.pop()?),
                    _ => None,
                };
                let named_flat = frame.pop_n(2 * nnamed)?;
                let positional = frame.pop_n(npos)?;
                let callee = frame.pop()?;
                let args = collect_arguments(positional, named_flat, varargs, kwargs)?;

                match callee {
                    Value::Function(f) => {
                        let recursion = f.module.program.options.recursion;
                        if !recursion && thread.frames.iter().any(|fr| fr.function.same_code(&f)) {
                            return Err(format!("function {} called recursively", f.name()));
                        }
                        if thread.frames.len() >= MAX_DEPTH {
                            return Err("call stack depth exceeded".to_string());
                        }
                        let locals = bind_arguments(&f, args)?;
                        trace!(function = f.name(), depth = thread.frames.len() + 1, "push frame");
                        thread.frames.push(Frame::new(f, locals));
                    }
                    Value::Builtin(b) => {
                        let result = (b.func)(thread, args).map_err(|msg| format!("{}: {}", b.name, msg))?;
                        let Some(frame) = thread.frames.last_mut() else {
                            return Err("internal error: no active frame".to_string());
                        };
                        frame.stack.push(result);
                    }
                    other => return Err(format!("invalid call of non-function ({})", other.type_name())),
                }
            }
            OpCode::Return => {
                let result = frame.pop()?;
                if let Some(done) = thread.frames.pop() {
                    trace!(function = done.function.name(), depth = thread.frames.len() + 1, "pop frame");
                }
                if thread.frames.len() <= base {
                    return Ok(result);
                }
                let Some(caller) = thread.frames.last_mut() else {
                    return Err("internal error: no active frame".to_string());
                };
                caller.stack.push(result);
            }
        }
    }
}

fn binary_op(opcode: OpCode) -> BinaryOp {
    match opcode {
        OpCode::Eql => BinaryOp::Eq,
        OpCode::Neq => BinaryOp::Ne,
        OpCode::Lt => BinaryOp::Lt,
        OpCode::Le => BinaryOp::Le,
        OpCode::Gt => BinaryOp::Gt,
        OpCode::Ge => BinaryOp::Ge,
        OpCode::In => BinaryOp::In,
        OpCode::Pipe => BinaryOp::Pipe,
        OpCode::Caret => BinaryOp::Caret,
        OpCode::Amp => BinaryOp::Amp,
        OpCode::Shl => BinaryOp::Shl,
        OpCode::Shr => BinaryOp::Shr,
        OpCode::Minus => BinaryOp::Minus,
        OpCode::Star => BinaryOp::Star,
        OpCode::Slash => BinaryOp::Slash,
        OpCode::SlashSlash => BinaryOp::SlashSlash,
        OpCode::Percent => BinaryOp::Percent,
        // Plus
        _ => BinaryOp::Plus,
    }
}

/// Assembles call arguments from the operand stack, expanding `*args` and
/// `**kwargs`.
fn collect_arguments(
    mut positional: Vec<Value>,
    named_flat: Vec<Value>,
    varargs: Option<Value>,
    kwargs: Option<Value>,
) -> Result<Arguments, String> {
    let mut named = Vec::with_capacity(named_flat.len() / 2);
    let mut flat = named_flat.into_iter();
    while let (Some(key), Some(value)) = (flat.next(), flat.next()) {
        match key {
            Value::String(s) => named.push((s.to_string(), value)),
            other => return Err(format!("internal error: argument name is {}", other.type_name())),
        }
    }
    if let Some(varargs) = varargs {
        let extra = varargs
            .iterate()
            .map_err(|_| format!("argument after * must be iterable, not {}", varargs.type_name()))?;
        positional.extend(extra);
    }
    if let Some(kwargs) = kwargs {
        let Value::Dict(d) = kwargs else {
            return Err(format!("argument after ** must be a mapping, not {}", kwargs.type_name()));
        };
        for (key, value) in d.items() {
            match key {
                Value::String(s) => named.push((s.to_string(), value)),
                other => return Err(format!("keywords must be strings, not {}", other.type_name())),
            }
        }
    }
    Ok(Arguments { positional, named })
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Binds call arguments to the parameters of `function`, producing its
/// initial local slots.
fn bind_arguments(function: &Function, args: Arguments) -> Result<Vec<Slot>, String> {
    let fc = function.funcode();
    let name = &fc.name;
    let nparams = fc.num_positional();
    let given = args.positional.len();
    let mut values: Vec<Option<Value>> = vec![None; fc.locals.len()];

    let mut positional = args.positional.into_iter();
    for (slot, value) in values.iter_mut().take(nparams).zip(positional.by_ref()) {
        *slot = Some(value);
    }
    let extra: Vec<Value> = positional.collect();
    if !extra.is_empty() && !fc.has_varargs {
        return Err(format!(
            "function {} accepts at most {} positional argument{} ({} given)",
            name,
            nparams,
            plural(nparams),
            given
        ));
    }

    let kwargs = fc.has_kwargs.then(Dict::new);
    for (key, value) in args.named {
        match fc.locals[..nparams].iter().position(|local| local.name == key) {
            Some(i) if values[i].is_some() => {
                return Err(format!("function {} got multiple values for parameter \"{}\"", name, key));
            }
            Some(i) => values[i] = Some(value),
            None => {
                let Some(kwargs) = &kwargs else {
                    return Err(format!("function {} got an unexpected keyword argument \"{}\"", name, key));
                };
                let key = Value::from(key);
                if kwargs.get(&key)?.is_some() {
                    return Err(format!("function {} got multiple values for parameter {}", name, key.repr()));
                }
                kwargs.insert(key, value)?;
            }
        }
    }

    let first_default = nparams.saturating_sub(fc.num_defaults);
    for (i, slot) in values.iter_mut().enumerate().take(nparams).skip(first_default) {
        if slot.is_none() {
            *slot = function.defaults.get(i - first_default).cloned();
        }
    }
    let missing: Vec<&str> = (0..nparams)
        .filter(|&i| values[i].is_none())
        .map(|i| fc.locals[i].name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "function {} missing {} argument{} ({})",
            name,
            missing.len(),
            plural(missing.len()),
            missing.join(", ")
        ));
    }

    let mut next = nparams;
    if fc.has_varargs {
        values[next] = Some(Value::new_tuple(extra));
        next += 1;
    }
    if let Some(kwargs) = kwargs {
        values[next] = Some(Value::Dict(Arc::new(kwargs)));
    }

    let mut slots: Vec<Slot> = values
        .into_iter()
        .map(|v| v.map_or(Slot::Unbound, Slot::Bound))
        .collect();
    for &index in &fc.cells {
        let initial = match std::mem::replace(&mut slots[index], Slot::Unbound) {
            Slot::Bound(v) => Some(v),
            _ => None,
        };
        slots[index] = Slot::Cell(new_cell(initial));
    }
    Ok(slots)
}
