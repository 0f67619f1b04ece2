//! Value representation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use parking_lot::Mutex;

use super::dict::Dict;
use super::function::{Builtin, Function};

/// A value.
///
/// Values are thread-safe so that the results of one execution can be handed
/// to other threads. Mutable containers carry their own lock and a frozen
/// flag.
#[derive(Debug, Clone)]
pub enum Value {
    /// None
    None,
    /// True or False
    Bool(bool),
    /// Integer that fits in 64 bits
    Int(i64),
    /// Integer that does not; never holds a value that would fit in `Int`
    BigInt(Arc<BigInt>),
    /// IEEE 754 double
    Float(f64),
    /// Text string
    String(Arc<str>),
    /// Byte string
    Bytes(Arc<[u8]>),
    /// Mutable list
    List(Arc<List>),
    /// Immutable tuple
    Tuple(Arc<[Value]>),
    /// Insertion-ordered dictionary
    Dict(Arc<Dict>),
    /// Closure created by `def` or `lambda`
    Function(Arc<Function>),
    /// Function implemented by the host
    Builtin(Arc<Builtin>),
}

impl Value {
    /// Makes an integer value from a big integer, narrowing when it fits.
    pub fn from_bigint(i: BigInt) -> Value {
        match i.to_i64() {
            Some(small) => Value::Int(small),
            None => Value::BigInt(Arc::new(i)),
        }
    }

    /// Makes a new unfrozen list.
    pub fn new_list(elems: Vec<Value>) -> Value {
        Value::List(Arc::new(List::new(elems)))
    }

    /// Makes a tuple.
    pub fn new_tuple(elems: Vec<Value>) -> Value {
        Value::Tuple(Arc::from(elems))
    }

    /// Returns the type name used in error messages and by `type()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::BigInt(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    /// Returns the truth value.
    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::BigInt(_) => true,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Returns the string contents if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an int that fits in 64 bits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the elements of a list or tuple.
    pub fn as_sequence(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(l) => Some(l.elems()),
            Value::Tuple(t) => Some(t.to_vec()),
            _ => None,
        }
    }

    /// Returns the elements produced by iterating over the value. Lists and
    /// dicts are copied, so the loop body may mutate them freely.
    pub fn iterate(&self) -> Result<Vec<Value>, String> {
        match self {
            Value::List(l) => Ok(l.elems()),
            Value::Tuple(t) => Ok(t.to_vec()),
            Value::Dict(d) => Ok(d.keys()),
            other => Err(format!("{} value is not iterable", other.type_name())),
        }
    }

    /// Freezes the value and everything reachable from it.
    pub fn freeze(&self) {
        freeze_reachable(vec![self.clone()]);
    }

    /// Returns the quoted representation, as produced by `repr()`.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        write_value(&mut out, self, true, &mut Vec::new());
        out
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        super::ops::equal(self, other).unwrap_or(false)
    }
}

/// `str()` form: strings are unquoted, everything else as `repr()`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_value(&mut out, self, false, &mut Vec::new());
        f.write_str(&out)
    }
}

/// Writes a value, printing containers already on `path` as `...` so that
/// cyclic structures terminate.
fn write_value(out: &mut String, v: &Value, quote: bool, path: &mut Vec<usize>) {
    use std::fmt::Write;

    match v {
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        Value::BigInt(i) => {
            let _ = write!(out, "{}", i);
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::String(s) if quote => quote_str(out, s),
        Value::String(s) => out.push_str(s),
        Value::Bytes(b) => quote_bytes(out, b),
        Value::List(l) => {
            let addr = Arc::as_ptr(l) as usize;
            if path.contains(&addr) {
                out.push_str("[...]");
                return;
            }
            path.push(addr);
            out.push('[');
            write_elems(out, &l.elems(), path);
            out.push(']');
            path.pop();
        }
        Value::Tuple(t) => {
            out.push('(');
            write_elems(out, t, path);
            if t.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Value::Dict(d) => {
            let addr = Arc::as_ptr(d) as usize;
            if path.contains(&addr) {
                out.push_str("{...}");
                return;
            }
            path.push(addr);
            out.push('{');
            for (i, (k, v)) in d.items().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k, true, path);
                out.push_str(": ");
                write_value(out, v, true, path);
            }
            out.push('}');
            path.pop();
        }
        Value::Function(func) => {
            let _ = write!(out, "<function {}>", func.name());
        }
        Value::Builtin(b) => {
            let _ = write!(out, "<built-in function {}>", b.name);
        }
    }
}

fn write_elems(out: &mut String, elems: &[Value], path: &mut Vec<usize>) {
    for (i, elem) in elems.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(out, elem, true, path);
    }
}

fn quote_str(out: &mut String, s: &str) {
    use std::fmt::Write;

    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn quote_bytes(out: &mut String, b: &[u8]) {
    use std::fmt::Write;

    out.push_str("b\"");
    for &byte in b {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", byte);
            }
        }
    }
    out.push('"');
}

/// Formats a float the way `str()` does: shortest round-trip digits, always
/// with a decimal point or exponent.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+inf" } else { "-inf" }.to_string();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let s = format!("{:e}", f);
        return match s.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => s,
        };
    }
    let s = format!("{}", f);
    if s.contains('.') { s } else { s + ".0" }
}

/// A mutable list.
#[derive(Debug, Default)]
pub struct List {
    elems: Mutex<Vec<Value>>,
    frozen: AtomicBool,
}

impl List {
    /// Creates an unfrozen list.
    pub fn new(elems: Vec<Value>) -> Self {
        Self {
            elems: Mutex::new(elems),
            frozen: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the elements.
    pub fn elems(&self) -> Vec<Value> {
        self.elems.lock().clone()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elems.lock().len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`, which must be in range.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elems.lock().get(index).cloned()
    }

    /// Returns true if the list has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Replaces the element at `index`.
    pub fn set(&self, index: usize, value: Value) -> Result<(), String> {
        if self.is_frozen() {
            return Err("cannot assign to element of frozen list".into());
        }
        let mut elems = self.elems.lock();
        match elems.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!("index {} out of range: length {}", index, elems.len())),
        }
    }

    /// Appends every value in `values`.
    pub fn extend(&self, values: Vec<Value>) -> Result<(), String> {
        if self.is_frozen() {
            return Err("cannot append to frozen list".into());
        }
        self.elems.lock().extend(values);
        Ok(())
    }

    /// Freezes the list and its elements.
    pub fn freeze(&self) {
        if self.mark_frozen() {
            freeze_reachable(self.elems());
        }
    }

    /// Sets the frozen flag, returning false if it was already set.
    pub(crate) fn mark_frozen(&self) -> bool {
        !self.frozen.swap(true, Ordering::AcqRel)
    }
}

/// Freezes every value reachable from `pending`.
///
/// Works from an explicit stack so that deep nesting cannot overflow the
/// native one. The frozen flags of lists, dicts and functions double as the
/// visited set, which also terminates cycles.
pub(crate) fn freeze_reachable(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(l) => {
                if l.mark_frozen() {
                    pending.extend(l.elems());
                }
            }
            Value::Tuple(t) => pending.extend(t.iter().cloned()),
            Value::Dict(d) => {
                if d.mark_frozen() {
                    for (k, v) in d.items() {
                        pending.push(k);
                        pending.push(v);
                    }
                }
            }
            Value::Function(f) => {
                if f.mark_frozen() {
                    pending.extend(f.captured());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::from_bigint(BigInt::from(1) << 80).type_name(), "int");
        assert_eq!(Value::new_tuple(vec![]).type_name(), "tuple");
    }

    #[test]
    fn test_bigint_narrowing() {
        assert!(matches!(Value::from_bigint(BigInt::from(42)), Value::Int(42)));
        assert!(matches!(Value::from_bigint(BigInt::from(i64::MAX) + 1), Value::BigInt(_)));
    }

    #[test]
    fn test_truth() {
        assert!(!Value::None.truth());
        assert!(!Value::Int(0).truth());
        assert!(Value::from("a").truth());
        assert!(!Value::new_list(vec![]).truth());
        assert!(Value::new_tuple(vec![Value::None]).truth());
    }

    #[test]
    fn test_str_and_repr() {
        let v = Value::new_list(vec![
            Value::from("a\"b"),
            Value::Int(1),
            Value::Float(2.0),
            Value::new_tuple(vec![Value::None]),
        ]);
        assert_eq!(v.repr(), r#"["a\"b", 1, 2.0, (None,)]"#);
        assert_eq!(Value::from("murmur").to_string(), "murmur");
        assert_eq!(Value::from("murmur").repr(), "\"murmur\"");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "+inf");
    }

    #[test]
    fn test_cyclic_list_repr_terminates() {
        let list = Arc::new(List::new(vec![Value::Int(1)]));
        list.set(0, Value::List(list.clone())).expect("Should set");
        assert_eq!(Value::List(list).repr(), "[[...]]");
    }

    #[test]
    fn test_frozen_list_rejects_mutation() {
        let list = List::new(vec![Value::Int(1)]);
        list.freeze();
        assert_eq!(
            list.set(0, Value::None).expect_err("frozen"),
            "cannot assign to element of frozen list"
        );
        assert_eq!(list.extend(vec![]).expect_err("frozen"), "cannot append to frozen list");
    }
}
