//! General purpose builtins.

use crate::runtime::function::Arguments;
use crate::runtime::value::Value;
use crate::vm::Thread;

type NativeResult = Result<Value, String>;

/// Largest list `range` will build.
const MAX_RANGE_LEN: i128 = 1 << 24;

/// Joins the `str()` forms of the positional arguments with the `sep`
/// keyword, a single space by default.
fn join_args(mut args: Arguments) -> Result<String, String> {
    let sep = match args.take_named("sep") {
        Some(Value::String(s)) => s.to_string(),
        Some(other) => return Err(format!("for parameter sep: got {}, want string", other.type_name())),
        None => " ".to_string(),
    };
    args.no_named()?;
    let parts: Vec<String> = args.positional.iter().map(|v| v.to_string()).collect();
    Ok(parts.join(&sep))
}

/// `print(*args, sep=" ")` sends the joined arguments to the thread's
/// print hook.
pub fn print(thread: &mut Thread, args: Arguments) -> NativeResult {
    let msg = join_args(args)?;
    thread.print(&msg);
    Ok(Value::None)
}

/// `fail(*args, sep=" ")` aborts execution with the joined arguments as the
/// error message.
pub fn fail(_thread: &mut Thread, args: Arguments) -> NativeResult {
    Err(join_args(args)?)
}

/// `len(x)`
pub fn len(_thread: &mut Thread, args: Arguments) -> NativeResult {
    args.no_named()?;
    args.arity(1, 1)?;
    let n = match &args.positional[0] {
        Value::String(s) => s.len(),
        Value::Bytes(b) => b.len(),
        Value::List(l) => l.len(),
        Value::Tuple(t) => t.len(),
        Value::Dict(d) => d.len(),
        other => return Err(format!("value of type {} has no len", other.type_name())),
    };
    Ok(Value::Int(n as i64))
}

/// `range(stop)` or `range(start, stop, step=1)`; returns a list.
pub fn range(_thread: &mut Thread, args: Arguments) -> NativeResult {
    args.no_named()?;
    args.arity(1, 3)?;
    let mut ints = Vec::with_capacity(3);
    for (i, v) in args.positional.iter().enumerate() {
        match v {
            Value::Int(n) => ints.push(i128::from(*n)),
            other => return Err(format!("for parameter {}: got {}, want int", i + 1, other.type_name())),
        }
    }
    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err("got no arguments, want 1 to 3".into()),
    };
    if step == 0 {
        return Err("step argument must not be zero".into());
    }
    let count = if step > 0 {
        (stop - start + step - 1) / step
    } else {
        (start - stop - step - 1) / -step
    }
    .max(0);
    if count > MAX_RANGE_LEN {
        return Err(format!("range of {} elements is too large", count));
    }
    let elems = (0..count).map(|i| Value::Int((start + i * step) as i64)).collect();
    Ok(Value::new_list(elems))
}
