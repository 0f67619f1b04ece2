//! Type constructors and conversions.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Num};

use crate::runtime::dict::Dict;
use crate::runtime::function::Arguments;
use crate::runtime::value::Value;
use crate::vm::Thread;

type NativeResult = Result<Value, String>;

/// Returns the single optional positional argument.
fn optional_arg(args: Arguments) -> Result<Option<Value>, String> {
    args.no_named()?;
    args.arity(0, 1)?;
    Ok(args.positional.into_iter().next())
}

fn single_arg(args: Arguments) -> Result<Value, String> {
    args.no_named()?;
    args.arity(1, 1)?;
    args.positional
        .into_iter()
        .next()
        .ok_or_else(|| "missing argument".to_string())
}

/// `bool(x=False)`
pub fn bool_(_thread: &mut Thread, args: Arguments) -> NativeResult {
    Ok(Value::Bool(optional_arg(args)?.is_some_and(|x| x.truth())))
}

/// `float(x=0.0)`
pub fn float(_thread: &mut Thread, args: Arguments) -> NativeResult {
    let Some(x) = optional_arg(args)? else {
        return Ok(Value::Float(0.0));
    };
    match &x {
        Value::Float(_) => Ok(x.clone()),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::BigInt(i) => num_traits::ToPrimitive::to_f64(&**i)
            .filter(|f| f.is_finite())
            .map(Value::Float)
            .ok_or_else(|| "int too large to convert to float".to_string()),
        Value::String(s) => parse_float(s)
            .map(Value::Float)
            .ok_or_else(|| format!("invalid float literal: {}", x.repr())),
        other => Err(format!("got {}, want number or string", other.type_name())),
    }
}

fn parse_float(s: &str) -> Option<f64> {
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" | "+nan" | "-nan" => Some(f64::NAN),
        lower if lower.contains(|c: char| c.is_ascii_alphabetic() && c != 'e') => None,
        _ => s.parse().ok(),
    }
}

/// `int(x=0, base=10)`
pub fn int(_thread: &mut Thread, mut args: Arguments) -> NativeResult {
    let base_kw = args.take_named("base");
    args.no_named()?;
    args.arity(0, 2)?;
    let mut positional = args.positional.into_iter();
    let Some(x) = positional.next() else {
        return Ok(Value::Int(0));
    };
    let base = match (positional.next(), base_kw) {
        (Some(_), Some(_)) => return Err("got multiple values for parameter \"base\"".into()),
        (Some(b), None) | (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    if let Value::String(s) = &x {
        let base = match base {
            Some(Value::Int(b)) if b == 0 || (2..=36).contains(&b) => b as u32,
            Some(b) => return Err(format!("invalid base {}", b.repr())),
            None => 10,
        };
        return parse_int(s, base).ok_or_else(|| format!("invalid literal with base {}: {}", base, x.repr()));
    }
    if base.is_some() {
        return Err("can't convert non-string with explicit base".into());
    }
    match &x {
        Value::Int(_) | Value::BigInt(_) => Ok(x.clone()),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(format!("cannot convert float {} to integer", x));
            }
            BigInt::from_f64(f.trunc())
                .map(Value::from_bigint)
                .ok_or_else(|| format!("cannot convert float {} to integer", x))
        }
        other => Err(format!("got {}, want number or string", other.type_name())),
    }
}

/// Parses an integer literal. Base 0 takes the base from the prefix; an
/// explicit base permits its own prefix.
fn parse_int(s: &str, base: u32) -> Option<Value> {
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let lower = rest.to_ascii_lowercase();
    let prefixed = |p: &str| lower.strip_prefix(p).map(str::to_string);
    let (base, digits) = match base {
        0 => match (prefixed("0x"), prefixed("0o"), prefixed("0b")) {
            (Some(d), _, _) => (16, d),
            (_, Some(d), _) => (8, d),
            (_, _, Some(d)) => (2, d),
            _ if lower.len() > 1 && lower.starts_with('0') => return None,
            _ => (10, lower.clone()),
        },
        16 => (16, prefixed("0x").unwrap_or_else(|| lower.clone())),
        8 => (8, prefixed("0o").unwrap_or_else(|| lower.clone())),
        2 => (2, prefixed("0b").unwrap_or_else(|| lower.clone())),
        b => (b, lower.clone()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
        return None;
    }
    let value = BigInt::from_str_radix(&digits, base).ok()?;
    Some(Value::from_bigint(if negative { -value } else { value }))
}

/// `list(x=[])`
pub fn list(_thread: &mut Thread, args: Arguments) -> NativeResult {
    match optional_arg(args)? {
        Some(x) => Ok(Value::new_list(x.iterate()?)),
        None => Ok(Value::new_list(Vec::new())),
    }
}

/// `tuple(x=())`
pub fn tuple(_thread: &mut Thread, args: Arguments) -> NativeResult {
    match optional_arg(args)? {
        Some(Value::Tuple(t)) => Ok(Value::Tuple(t)),
        Some(x) => Ok(Value::new_tuple(x.iterate()?)),
        None => Ok(Value::new_tuple(Vec::new())),
    }
}

/// `dict(pairs=[], **kwargs)`
pub fn dict(_thread: &mut Thread, args: Arguments) -> NativeResult {
    args.arity(0, 1)?;
    let d = Dict::new();
    if let Some(pairs) = args.positional.into_iter().next() {
        match &pairs {
            Value::Dict(src) => {
                for (k, v) in src.items() {
                    d.insert(k, v)?;
                }
            }
            _ => {
                for (i, item) in pairs.iterate()?.into_iter().enumerate() {
                    let Some(kv) = item.as_sequence() else {
                        return Err(format!(
                            "dictionary update sequence element #{} is not iterable ({})",
                            i,
                            item.type_name()
                        ));
                    };
                    let [k, v]: [Value; 2] = kv.try_into().map_err(|kv: Vec<Value>| {
                        format!("dictionary update sequence element #{} has length {}, want 2", i, kv.len())
                    })?;
                    d.insert(k, v)?;
                }
            }
        }
    }
    for (name, value) in args.named {
        d.insert(Value::from(name), value)?;
    }
    Ok(Value::Dict(Arc::new(d)))
}

/// `repr(x)`
pub fn repr(_thread: &mut Thread, args: Arguments) -> NativeResult {
    Ok(Value::from(single_arg(args)?.repr()))
}

/// `str(x)`
pub fn str_(_thread: &mut Thread, args: Arguments) -> NativeResult {
    let x = single_arg(args)?;
    match &x {
        Value::String(_) => Ok(x.clone()),
        other => Ok(Value::from(other.to_string())),
    }
}

/// `type(x)`
pub fn type_(_thread: &mut Thread, args: Arguments) -> NativeResult {
    Ok(Value::from(single_arg(args)?.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: fn(&mut Thread, Arguments) -> NativeResult, positional: Vec<Value>) -> NativeResult {
        let mut thread = Thread::new("test");
        f(&mut thread, Arguments { positional, named: Vec::new() })
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(call(int, vec![Value::from("42")]).expect("int"), Value::Int(42));
        assert_eq!(call(int, vec![Value::from("-0x1f"), Value::Int(0)]).expect("int"), Value::Int(-31));
        assert_eq!(call(int, vec![Value::from("ff"), Value::Int(16)]).expect("int"), Value::Int(255));
        assert_eq!(call(int, vec![Value::Float(-2.7)]).expect("int"), Value::Int(-2));
        assert_eq!(call(int, vec![Value::Bool(true)]).expect("int"), Value::Int(1));
        let err = call(int, vec![Value::from("abc")]).expect_err("bad literal");
        assert_eq!(err, "invalid literal with base 10: \"abc\"");
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(call(float, vec![Value::Int(2)]).expect("float"), Value::Float(2.0));
        assert_eq!(call(float, vec![Value::from("1.5")]).expect("float"), Value::Float(1.5));
        assert!(call(float, vec![Value::from("x1")]).is_err());
    }

    #[test]
    fn test_bool_str_repr_type() {
        assert_eq!(call(bool_, vec![]).expect("bool"), Value::Bool(false));
        assert_eq!(call(bool_, vec![Value::from("x")]).expect("bool"), Value::Bool(true));
        assert_eq!(call(str_, vec![Value::Int(3)]).expect("str"), Value::from("3"));
        assert_eq!(call(repr, vec![Value::from("a")]).expect("repr"), Value::from("\"a\""));
        assert_eq!(call(type_, vec![Value::None]).expect("type"), Value::from("NoneType"));
    }

    #[test]
    fn test_dict_from_pairs_and_keywords() {
        let mut thread = Thread::new("test");
        let pairs = Value::new_list(vec![Value::new_tuple(vec![Value::from("a"), Value::Int(1)])]);
        let d = dict(
            &mut thread,
            Arguments {
                positional: vec![pairs],
                named: vec![("b".to_string(), Value::Int(2))],
            },
        )
        .expect("dict");
        assert_eq!(d.repr(), "{\"a\": 1, \"b\": 2}");

        let bad = Value::new_list(vec![Value::new_tuple(vec![Value::Int(1)])]);
        let err = call(dict, vec![bad]).expect_err("short pair");
        assert_eq!(err, "dictionary update sequence element #0 has length 1, want 2");
    }

    #[test]
    fn test_list_and_tuple_copy() {
        let src = Value::new_list(vec![Value::Int(1)]);
        let copy = call(list, vec![src.clone()]).expect("list");
        assert_eq!(copy, src);
        assert!(matches!(call(tuple, vec![src]).expect("tuple"), Value::Tuple(_)));
    }
}
