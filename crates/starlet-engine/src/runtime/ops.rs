//! Operators on values.
//!
//! Every operator is a closed dispatch on the operand kinds; combinations
//! without a case fail with `unknown binary op` or `unknown unary op`.

use std::cmp::Ordering;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use super::dict::Dict;
use super::value::Value;
use crate::ast::{BinaryOp, UnaryOp};

type OpResult<T> = std::result::Result<T, String>;

/// Nesting limit for structural comparison of containers.
const MAX_COMPARE_DEPTH: usize = 100;

/// Largest shift count accepted by `<<`.
const MAX_SHIFT: i64 = 512;

/// Largest number of elements a repetition may produce.
const MAX_REPEAT: usize = 1 << 28;

fn unknown_binary(op: BinaryOp, x: &Value, y: &Value) -> String {
    format!("unknown binary op: {} {} {}", x.type_name(), op, y.type_name())
}

// ============================================================================
// Integers
// ============================================================================

#[derive(Clone, Copy)]
enum Int<'a> {
    Small(i64),
    Big(&'a BigInt),
}

impl Int<'_> {
    fn of(v: &Value) -> Option<Int<'_>> {
        match v {
            Value::Int(i) => Some(Int::Small(*i)),
            Value::BigInt(i) => Some(Int::Big(i)),
            _ => None,
        }
    }

    fn to_big(self) -> BigInt {
        match self {
            Int::Small(i) => BigInt::from(i),
            Int::Big(i) => i.clone(),
        }
    }

    fn to_f64(self) -> OpResult<f64> {
        match self {
            Int::Small(i) => Ok(i as f64),
            Int::Big(i) => i
                .to_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| "int too large to convert to float".to_string()),
        }
    }
}

fn small_int_op(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOp::Plus => a.checked_add(b),
        BinaryOp::Minus => a.checked_sub(b),
        BinaryOp::Star => a.checked_mul(b),
        BinaryOp::Pipe => Some(a | b),
        BinaryOp::Caret => Some(a ^ b),
        BinaryOp::Amp => Some(a & b),
        BinaryOp::SlashSlash | BinaryOp::Percent if b != 0 => {
            let (q, r) = (a.checked_div(b)?, a.checked_rem(b)?);
            let adjust = r != 0 && (r < 0) != (b < 0);
            Some(match (op, adjust) {
                (BinaryOp::SlashSlash, true) => q - 1,
                (BinaryOp::SlashSlash, false) => q,
                (_, true) => r + b,
                (_, false) => r,
            })
        }
        _ => None,
    }
}

fn int_op(op: BinaryOp, x: Int<'_>, y: Int<'_>) -> OpResult<Value> {
    if let (Int::Small(a), Int::Small(b)) = (x, y) {
        if let Some(r) = small_int_op(op, a, b) {
            return Ok(Value::Int(r));
        }
    }
    let (a, b) = (x.to_big(), y.to_big());
    let r = match op {
        BinaryOp::Plus => a + b,
        BinaryOp::Minus => a - b,
        BinaryOp::Star => a * b,
        BinaryOp::Pipe => a | b,
        BinaryOp::Caret => a ^ b,
        BinaryOp::Amp => a & b,
        BinaryOp::SlashSlash | BinaryOp::Percent => {
            if b.is_zero() {
                return Err(if op == BinaryOp::SlashSlash {
                    "integer division by zero".into()
                } else {
                    "integer modulo by zero".into()
                });
            }
            let (q, r) = (&a / &b, &a % &b);
            let adjust = !r.is_zero() && r.is_negative() != b.is_negative();
            match (op, adjust) {
                (BinaryOp::SlashSlash, true) => q - 1,
                (BinaryOp::SlashSlash, false) => q,
                (_, true) => r + b,
                (_, false) => r,
            }
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            let n = match b.to_i64() {
                Some(n) if n >= 0 => n,
                _ if b.is_negative() => return Err(format!("negative shift count: {}", b)),
                _ => i64::MAX,
            };
            if op == BinaryOp::Shl {
                if n >= MAX_SHIFT {
                    return Err(format!("shift count too large: {}", b));
                }
                a << n as usize
            } else {
                // shifting by more than the width leaves only the sign
                let width = a.bits() as i64 + 1;
                a >> n.min(width) as usize
            }
        }
        _ => return Err(format!("unknown binary op: int {} int", op)),
    };
    Ok(Value::from_bigint(r))
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> OpResult<Value> {
    let r = match op {
        BinaryOp::Plus => a + b,
        BinaryOp::Minus => a - b,
        BinaryOp::Star => a * b,
        BinaryOp::Slash => {
            if b == 0.0 {
                return Err("floating-point division by zero".into());
            }
            a / b
        }
        BinaryOp::SlashSlash => {
            if b == 0.0 {
                return Err("floating-point division by zero".into());
            }
            (a / b).floor()
        }
        BinaryOp::Percent => {
            if b == 0.0 {
                return Err("floating-point modulo by zero".into());
            }
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
        }
        _ => return Err(format!("unknown binary op: float {} float", op)),
    };
    Ok(Value::Float(r))
}

fn to_float(v: &Value) -> Option<OpResult<f64>> {
    match v {
        Value::Float(f) => Some(Ok(*f)),
        _ => Int::of(v).map(Int::to_f64),
    }
}

// ============================================================================
// Sequences
// ============================================================================

fn repeat_count(n: &Value, len: usize) -> Option<OpResult<usize>> {
    if len == 0 && Int::of(n).is_some() {
        return Some(Ok(0));
    }
    let count = match n {
        Value::Int(i) => *i,
        Value::BigInt(i) if i.is_negative() => 0,
        Value::BigInt(_) => return Some(Err(format!("excessive repeat ({} * {} elements)", len, n))),
        _ => return None,
    };
    let count = count.max(0) as usize;
    if len.saturating_mul(count) > MAX_REPEAT {
        return Some(Err(format!("excessive repeat ({} * {} elements)", len, count)));
    }
    Some(Ok(count))
}

fn repeat<T: Clone>(elems: &[T], n: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(elems.len() * n);
    for _ in 0..n {
        out.extend_from_slice(elems);
    }
    out
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

fn repeat_value(seq: &Value, n: &Value) -> Option<OpResult<Value>> {
    Some(match seq {
        Value::String(s) => repeat_count(n, s.len())?.map(|n| Value::from(s.repeat(n))),
        Value::Bytes(b) => repeat_count(n, b.len())?.map(|n| Value::Bytes(Arc::from(repeat(b, n)))),
        Value::List(l) => {
            let elems = l.elems();
            repeat_count(n, elems.len())?.map(|n| Value::new_list(repeat(&elems, n)))
        }
        Value::Tuple(t) => repeat_count(n, t.len())?.map(|n| Value::new_tuple(repeat(t, n))),
        _ => return None,
    })
}

// ============================================================================
// Binary and unary operators
// ============================================================================

/// Applies an arithmetic, bitwise or membership operator.
pub fn binary(op: BinaryOp, x: &Value, y: &Value) -> OpResult<Value> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            return compare(op, x, y).map(Value::Bool);
        }
        BinaryOp::In => return contains(y, x).map(Value::Bool),
        BinaryOp::NotIn => return contains(y, x).map(|b| Value::Bool(!b)),
        _ => {}
    }

    if let (Some(a), Some(b)) = (Int::of(x), Int::of(y)) {
        if op == BinaryOp::Slash {
            return float_op(op, a.to_f64()?, b.to_f64()?);
        }
        return int_op(op, a, b);
    }
    if matches!(
        op,
        BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Star | BinaryOp::Slash | BinaryOp::SlashSlash | BinaryOp::Percent
    ) {
        if let (Some(a), Some(b)) = (to_float(x), to_float(y)) {
            return float_op(op, a?, b?);
        }
    }

    match (op, x, y) {
        (BinaryOp::Plus, Value::String(a), Value::String(b)) => Ok(Value::from(format!("{}{}", a, b))),
        (BinaryOp::Plus, Value::Bytes(a), Value::Bytes(b)) => Ok(Value::Bytes(Arc::from(concat(a, b)))),
        (BinaryOp::Plus, Value::List(a), Value::List(b)) => Ok(Value::new_list(concat(&a.elems(), &b.elems()))),
        (BinaryOp::Plus, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::new_tuple(concat(a, b))),
        (BinaryOp::Star, seq, n) => repeat_value(seq, n)
            .or_else(|| repeat_value(n, seq))
            .unwrap_or_else(|| Err(unknown_binary(op, x, y))),
        (BinaryOp::Pipe, Value::Dict(a), Value::Dict(b)) => {
            let union = Dict::new();
            for (k, v) in a.items().into_iter().chain(b.items()) {
                union.insert(k, v)?;
            }
            Ok(Value::Dict(Arc::new(union)))
        }
        _ => Err(unknown_binary(op, x, y)),
    }
}

/// Applies `x += y`. Lists are extended in place; everything else behaves
/// like `x + y`.
pub fn inplace_plus(x: &Value, y: &Value) -> OpResult<Value> {
    if let Value::List(list) = x {
        let extra = match y {
            Value::List(_) | Value::Tuple(_) => y.iterate()?,
            _ => return Err(unknown_binary(BinaryOp::Plus, x, y)),
        };
        list.extend(extra)?;
        return Ok(x.clone());
    }
    binary(BinaryOp::Plus, x, y)
}

/// Applies a unary operator.
pub fn unary(op: UnaryOp, x: &Value) -> OpResult<Value> {
    let unknown = || format!("unknown unary op: {} {}", op, x.type_name());
    match (op, x) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!x.truth())),
        (UnaryOp::Plus, Value::Int(_) | Value::BigInt(_) | Value::Float(_)) => Ok(x.clone()),
        (UnaryOp::Minus, Value::Int(i)) => Ok(i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or_else(|| Value::from_bigint(-BigInt::from(*i)))),
        (UnaryOp::Minus, Value::BigInt(i)) => Ok(Value::from_bigint(-(**i).clone())),
        (UnaryOp::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Tilde, Value::Int(i)) => Ok(Value::Int(!i)),
        (UnaryOp::Tilde, Value::BigInt(i)) => Ok(Value::from_bigint(-(**i).clone() - 1)),
        _ => Err(unknown()),
    }
}

// ============================================================================
// Comparison
// ============================================================================

enum CompareError {
    Unsupported(&'static str, &'static str),
    TooDeep,
}

impl CompareError {
    fn message(self, op: BinaryOp) -> String {
        match self {
            CompareError::Unsupported(l, r) => format!("unsupported comparison: {} {} {}", l, op, r),
            CompareError::TooDeep => "comparison exceeded maximum recursion depth".into(),
        }
    }
}

/// Reports whether two values are equal.
pub fn equal(x: &Value, y: &Value) -> OpResult<bool> {
    equal_depth(x, y, 0).map_err(|e| e.message(BinaryOp::Eq))
}

fn equal_depth(x: &Value, y: &Value, depth: usize) -> Result<bool, CompareError> {
    if depth > MAX_COMPARE_DEPTH {
        return Err(CompareError::TooDeep);
    }
    Ok(match (x, y) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bytes(a), Value::Bytes(b)) => a == b,
        (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || elems_equal(&a.elems(), &b.elems(), depth)?,
        (Value::Tuple(a), Value::Tuple(b)) => elems_equal(a, b, depth)?,
        (Value::Dict(a), Value::Dict(b)) => {
            if Arc::ptr_eq(a, b) {
                return Ok(true);
            }
            if a.len() != b.len() {
                return Ok(false);
            }
            for (k, v) in a.items() {
                match b.get(&k) {
                    Ok(Some(other)) if equal_depth(&v, &other, depth + 1)? => {}
                    _ => return Ok(false),
                }
            }
            true
        }
        (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(a, b) || a.name == b.name,
        _ => match number_ordering(x, y) {
            Some(ord) => ord == Some(Ordering::Equal),
            None => false,
        },
    })
}

fn elems_equal(a: &[Value], b: &[Value], depth: usize) -> Result<bool, CompareError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !equal_depth(x, y, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Orders two numbers. The outer `None` means not both are numbers; the
/// inner one means they are unordered (NaN).
fn number_ordering(x: &Value, y: &Value) -> Option<Option<Ordering>> {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => Some(Some(a.cmp(b))),
        (Value::Float(a), Value::Float(b)) => Some(a.partial_cmp(b)),
        _ => match (Int::of(x), Int::of(y)) {
            (Some(a), Some(b)) => Some(Some(a.to_big().cmp(&b.to_big()))),
            _ => {
                let a = to_float(x)?.ok().unwrap_or(f64::INFINITY);
                let b = to_float(y)?.ok().unwrap_or(f64::INFINITY);
                Some(a.partial_cmp(&b))
            }
        },
    }
}

fn ordering(x: &Value, y: &Value, depth: usize) -> Result<Option<Ordering>, CompareError> {
    if depth > MAX_COMPARE_DEPTH {
        return Err(CompareError::TooDeep);
    }
    if let Some(ord) = number_ordering(x, y) {
        return Ok(ord);
    }
    match (x, y) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Bytes(a), Value::Bytes(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => elems_ordering(&a.elems(), &b.elems(), depth),
        (Value::Tuple(a), Value::Tuple(b)) => elems_ordering(a, b, depth),
        _ => Err(CompareError::Unsupported(x.type_name(), y.type_name())),
    }
}

fn elems_ordering(a: &[Value], b: &[Value], depth: usize) -> Result<Option<Ordering>, CompareError> {
    for (x, y) in a.iter().zip(b) {
        if !equal_depth(x, y, depth + 1)? {
            return ordering(x, y, depth + 1);
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}

/// Evaluates a comparison operator.
pub fn compare(op: BinaryOp, x: &Value, y: &Value) -> OpResult<bool> {
    match op {
        BinaryOp::Eq => return equal(x, y),
        BinaryOp::Ne => return equal(x, y).map(|eq| !eq),
        _ => {}
    }
    let ord = ordering(x, y, 0).map_err(|e| e.message(op))?;
    Ok(match ord {
        None => false,
        Some(ord) => match op {
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::Le => ord != Ordering::Greater,
            BinaryOp::Gt => ord == Ordering::Greater,
            BinaryOp::Ge => ord != Ordering::Less,
            _ => return Err(unknown_binary(op, x, y)),
        },
    })
}

// ============================================================================
// Membership and indexing
// ============================================================================

/// Evaluates `x in container`.
pub fn contains(container: &Value, x: &Value) -> OpResult<bool> {
    match container {
        Value::List(_) | Value::Tuple(_) => {
            for elem in container.iterate()? {
                if equal(&elem, x)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Dict(d) => Ok(d.get(x)?.is_some()),
        Value::String(s) => match x {
            Value::String(needle) => Ok(s.contains(&**needle)),
            _ => Err(format!("'in <string>' requires string as left operand, not {}", x.type_name())),
        },
        Value::Bytes(b) => match x {
            Value::Bytes(needle) => Ok(needle.is_empty() || b.windows(needle.len()).any(|w| w == &needle[..])),
            Value::Int(i) => match u8::try_from(*i) {
                Ok(byte) => Ok(b.contains(&byte)),
                Err(_) => Err(format!("int in bytes: {} out of range", i)),
            },
            _ => Err(format!("'in bytes' requires bytes or int as left operand, not {}", x.type_name())),
        },
        _ => Err(unknown_binary(BinaryOp::In, x, container)),
    }
}

/// Converts a possibly negative index into an offset into a sequence of
/// length `len`.
fn sequence_index(kind: &str, i: &Value, len: usize) -> OpResult<usize> {
    let n = match i {
        Value::Int(n) => *n,
        Value::BigInt(n) => return Err(format!("index {} out of range: length {}", n, len)),
        _ => return Err(format!("{} index: got {}, want int", kind, i.type_name())),
    };
    let len_i = len as i64;
    let offset = if n < 0 { n + len_i } else { n };
    if offset < 0 || offset >= len_i {
        if len == 0 {
            return Err(format!("index {} out of range: empty {}", n, kind));
        }
        return Err(format!("index {} out of range [{}:{}]", n, -len_i, len_i - 1));
    }
    Ok(offset as usize)
}

/// Evaluates `x[i]`.
pub fn index(x: &Value, i: &Value) -> OpResult<Value> {
    match x {
        Value::List(l) => {
            let elems = l.elems();
            let at = sequence_index("list", i, elems.len())?;
            Ok(elems[at].clone())
        }
        Value::Tuple(t) => Ok(t[sequence_index("tuple", i, t.len())?].clone()),
        Value::String(s) => {
            let at = sequence_index("string", i, s.len())?;
            Ok(Value::from(String::from_utf8_lossy(&s.as_bytes()[at..=at]).into_owned()))
        }
        Value::Bytes(b) => Ok(Value::Int(i64::from(b[sequence_index("bytes", i, b.len())?]))),
        Value::Dict(d) => d.get(i)?.ok_or_else(|| format!("key {} not in dict", i.repr())),
        _ => Err(format!("unhandled index operation {}[{}]", x.type_name(), i.type_name())),
    }
}

/// Evaluates `x[i] = v`.
pub fn set_index(x: &Value, i: &Value, v: Value) -> OpResult<()> {
    match x {
        Value::List(l) => {
            let at = sequence_index("list", i, l.len())?;
            l.set(at, v)
        }
        Value::Dict(d) => d.insert(i.clone(), v),
        _ => Err(format!("{} value does not support item assignment", x.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_string_repetition() {
        assert_eq!(binary(BinaryOp::Star, &s("mur"), &Value::Int(2)).expect("repeat"), s("murmur"));
        assert_eq!(binary(BinaryOp::Star, &Value::Int(2), &s("ab")).expect("repeat"), s("abab"));
        assert_eq!(binary(BinaryOp::Star, &s("x"), &Value::Int(-1)).expect("repeat"), s(""));
    }

    #[test]
    fn test_empty_repetition_ignores_count() {
        let huge = Value::Int(1 << 62);
        let empty_tuple = Value::Tuple(Arc::from(Vec::new()));
        let r = binary(BinaryOp::Star, &empty_tuple, &huge).expect("repeat");
        assert_eq!(r.repr(), "()");
        let r = binary(BinaryOp::Star, &huge, &Value::new_list(Vec::new())).expect("repeat");
        assert_eq!(r.repr(), "[]");
        let r = binary(BinaryOp::Star, &Value::Bytes(Arc::from(&b""[..])), &huge).expect("repeat");
        assert_eq!(r, Value::Bytes(Arc::from(&b""[..])));
        let err = binary(BinaryOp::Star, &s("ab"), &huge).expect_err("too large");
        assert!(err.starts_with("excessive repeat"));
    }

    #[test]
    fn test_unknown_binary_op_message() {
        let err = binary(BinaryOp::Star, &s("mur"), &Value::None).expect_err("string * None");
        assert_eq!(err, "unknown binary op: string * NoneType");
        let err = binary(BinaryOp::Minus, &s("a"), &Value::Int(1)).expect_err("string - int");
        assert_eq!(err, "unknown binary op: string - int");
    }

    #[test]
    fn test_int_overflow_promotes() {
        let big = binary(BinaryOp::Plus, &Value::Int(i64::MAX), &Value::Int(1)).expect("add");
        assert_eq!(big.to_string(), "9223372036854775808");
        let back = binary(BinaryOp::Minus, &big, &Value::Int(1)).expect("sub");
        assert!(matches!(back, Value::Int(i64::MAX)));
    }

    #[test]
    fn test_floor_division_and_modulo() {
        let div = |a, b| binary(BinaryOp::SlashSlash, &Value::Int(a), &Value::Int(b)).expect("div");
        let rem = |a, b| binary(BinaryOp::Percent, &Value::Int(a), &Value::Int(b)).expect("mod");
        assert_eq!(div(7, 2), Value::Int(3));
        assert_eq!(div(-7, 2), Value::Int(-4));
        assert_eq!(rem(-7, 2), Value::Int(1));
        assert_eq!(rem(7, -2), Value::Int(-1));
        assert_eq!(
            binary(BinaryOp::Slash, &Value::Int(1), &Value::Int(2)).expect("div"),
            Value::Float(0.5)
        );
        let err = binary(BinaryOp::SlashSlash, &Value::Int(1), &Value::Int(0)).expect_err("zero");
        assert_eq!(err, "integer division by zero");
    }

    #[test]
    fn test_mixed_number_equality_and_ordering() {
        assert!(equal(&Value::Int(1), &Value::Float(1.0)).expect("eq"));
        assert!(compare(BinaryOp::Lt, &Value::Int(1), &Value::Float(1.5)).expect("lt"));
        assert!(!equal(&Value::Int(1), &Value::Bool(true)).expect("eq"));
    }

    #[test]
    fn test_unsupported_comparison() {
        let err = compare(BinaryOp::Lt, &Value::Int(1), &s("a")).expect_err("int < string");
        assert_eq!(err, "unsupported comparison: int < string");
    }

    #[test]
    fn test_sequence_comparison() {
        let a = Value::new_tuple(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::new_tuple(vec![Value::Int(1), Value::Int(3)]);
        assert!(compare(BinaryOp::Lt, &a, &b).expect("lt"));
        assert!(compare(BinaryOp::Le, &a, &a).expect("le"));
    }

    #[test]
    fn test_unary_ops() {
        assert_eq!(unary(UnaryOp::Minus, &Value::Int(3)).expect("neg"), Value::Int(-3));
        assert_eq!(unary(UnaryOp::Tilde, &Value::Int(0)).expect("not"), Value::Int(-1));
        assert_eq!(unary(UnaryOp::Not, &Value::None).expect("not"), Value::Bool(true));
        let err = unary(UnaryOp::Minus, &s("x")).expect_err("-string");
        assert_eq!(err, "unknown unary op: - string");
    }

    #[test]
    fn test_inplace_plus_extends_list() {
        let list = Value::new_list(vec![Value::Int(1)]);
        let alias = list.clone();
        inplace_plus(&list, &Value::new_list(vec![Value::Int(2)])).expect("extend");
        assert_eq!(alias.repr(), "[1, 2]");
        let sum = inplace_plus(&s("a"), &s("b")).expect("concat");
        assert_eq!(sum, s("ab"));
    }

    #[test]
    fn test_index_and_membership() {
        let list = Value::new_list(vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(index(&list, &Value::Int(-1)).expect("index"), Value::Int(20));
        let err = index(&list, &Value::Int(2)).expect_err("out of range");
        assert_eq!(err, "index 2 out of range [-2:1]");
        assert!(contains(&list, &Value::Int(10)).expect("in"));
        assert!(contains(&s("murmur"), &s("rm")).expect("in"));

        let d = Value::Dict(Arc::new(Dict::new()));
        let err = index(&d, &s("k")).expect_err("missing key");
        assert_eq!(err, "key \"k\" not in dict");
        set_index(&d, &s("k"), Value::Int(1)).expect("set");
        assert_eq!(index(&d, &s("k")).expect("get"), Value::Int(1));
    }

    #[test]
    fn test_self_containing_lists_compare_equal() {
        let list = Arc::new(super::super::value::List::new(vec![Value::None]));
        list.set(0, Value::List(list.clone())).expect("Should set");
        let v = Value::List(list);
        assert!(equal(&v, &v).expect("eq"));
    }
}
