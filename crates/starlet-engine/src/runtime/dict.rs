//! Insertion-ordered dictionary.
//!
//! Keys are reduced to a [`HashKey`] so that equal ints and floats land in
//! the same slot. The original key value is kept alongside the entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use super::value::{Value, freeze_reachable};

/// Hashable projection of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    /// None
    None,
    /// bool
    Bool(bool),
    /// Small int, or an integral float
    Int(i64),
    /// Big int, or a large integral float
    BigInt(BigInt),
    /// Non-integral float, by bit pattern
    Float(u64),
    /// string
    String(Arc<str>),
    /// bytes
    Bytes(Arc<[u8]>),
    /// Tuple of hashable elements
    Tuple(Vec<HashKey>),
    /// Functions hash by identity
    Identity(usize),
}

impl HashKey {
    /// Computes the key for `v`, failing for mutable values.
    pub fn of(v: &Value) -> Result<HashKey, String> {
        Ok(match v {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Int(i) => HashKey::Int(*i),
            Value::BigInt(i) => HashKey::BigInt((**i).clone()),
            Value::Float(f) => float_key(*f),
            Value::String(s) => HashKey::String(s.clone()),
            Value::Bytes(b) => HashKey::Bytes(b.clone()),
            Value::Tuple(t) => HashKey::Tuple(t.iter().map(HashKey::of).collect::<Result<_, _>>()?),
            Value::Function(f) => HashKey::Identity(Arc::as_ptr(f) as usize),
            Value::Builtin(b) => HashKey::Identity(Arc::as_ptr(b) as usize),
            Value::List(_) | Value::Dict(_) => return Err(format!("unhashable type: {}", v.type_name())),
        })
    }
}

/// Integral floats share keys with the equal int.
fn float_key(f: f64) -> HashKey {
    if f.fract() == 0.0 {
        if f >= i64::MIN as f64 && f < i64::MAX as f64 {
            return HashKey::Int(f as i64);
        }
        if let Some(i) = BigInt::from_f64(f) {
            return HashKey::BigInt(i);
        }
    }
    HashKey::Float(f.to_bits())
}

type Entries = IndexMap<HashKey, (Value, Value), FxBuildHasher>;

/// A mutable dictionary preserving insertion order.
#[derive(Debug, Default)]
pub struct Dict {
    entries: Mutex<Entries>,
    frozen: AtomicBool,
}

impl Dict {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the dictionary has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Looks up a key.
    pub fn get(&self, key: &Value) -> Result<Option<Value>, String> {
        let hk = HashKey::of(key)?;
        Ok(self.entries.lock().get(&hk).map(|(_, v)| v.clone()))
    }

    /// Inserts or replaces an entry.
    pub fn insert(&self, key: Value, value: Value) -> Result<(), String> {
        let hk = HashKey::of(&key)?;
        if self.is_frozen() {
            return Err("cannot insert into frozen hash table".into());
        }
        let mut entries = self.entries.lock();
        match entries.get_mut(&hk) {
            // an existing entry keeps its original key and position
            Some(entry) => entry.1 = value,
            None => {
                entries.insert(hk, (key, value));
            }
        }
        Ok(())
    }

    /// Inserts an entry whose key must not be present yet.
    pub fn insert_unique(&self, key: Value, value: Value) -> Result<(), String> {
        let hk = HashKey::of(&key)?;
        if self.is_frozen() {
            return Err("cannot insert into frozen hash table".into());
        }
        let mut entries = self.entries.lock();
        if entries.contains_key(&hk) {
            return Err(format!("duplicate key: {}", key.repr()));
        }
        entries.insert(hk, (key, value));
        Ok(())
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> Vec<Value> {
        self.entries.lock().values().map(|(k, _)| k.clone()).collect()
    }

    /// Returns the entries in insertion order.
    pub fn items(&self) -> Vec<(Value, Value)> {
        self.entries.lock().values().cloned().collect()
    }

    /// Freezes the dictionary and its contents.
    pub fn freeze(&self) {
        if self.mark_frozen() {
            freeze_reachable(self.items().into_iter().flat_map(|(k, v)| [k, v]).collect());
        }
    }

    /// Sets the frozen flag, returning false if it was already set.
    pub(crate) fn mark_frozen(&self) -> bool {
        !self.frozen.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_preserved() {
        let d = Dict::new();
        for key in ["b", "a", "c"] {
            d.insert(Value::from(key), Value::None).expect("Should insert");
        }
        d.insert(Value::from("b"), Value::Int(1)).expect("Should replace");
        let keys: Vec<String> = d.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(d.get(&Value::from("b")).expect("hashable"), Some(Value::Int(1)));
    }

    #[test]
    fn test_int_and_integral_float_share_a_key() {
        let d = Dict::new();
        d.insert(Value::Int(1), Value::from("int")).expect("Should insert");
        assert_eq!(d.get(&Value::Float(1.0)).expect("hashable"), Some(Value::from("int")));
        assert_eq!(d.get(&Value::Float(1.5)).expect("hashable"), None);
    }

    #[test]
    fn test_unhashable_keys() {
        let d = Dict::new();
        let err = d.insert(Value::new_list(vec![]), Value::None).expect_err("list key");
        assert_eq!(err, "unhashable type: list");
        let err = d
            .get(&Value::new_tuple(vec![Value::new_list(vec![])]))
            .expect_err("tuple holding a list");
        assert_eq!(err, "unhashable type: list");
    }

    #[test]
    fn test_insert_unique_rejects_duplicates() {
        let d = Dict::new();
        d.insert_unique(Value::from("a"), Value::Int(1)).expect("Should insert");
        let err = d.insert_unique(Value::from("a"), Value::Int(2)).expect_err("duplicate");
        assert_eq!(err, "duplicate key: \"a\"");
    }

    #[test]
    fn test_frozen_dict_rejects_insert() {
        let d = Dict::new();
        d.freeze();
        assert!(d.is_frozen());
        let err = d.insert(Value::Int(1), Value::None).expect_err("frozen");
        assert_eq!(err, "cannot insert into frozen hash table");
    }
}
