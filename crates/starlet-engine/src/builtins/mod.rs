//! The universe: names every program can use without declaring them.
//!
//! The resolver consults [`is_universal`] for names that are neither bound
//! in the file nor predeclared by the host; at execution time each referenced
//! name is looked up with [`universe_value`].
//!
//! ## Structure
//!
//! - `conversion` - `bool`, `dict`, `float`, `int`, `list`, `repr`, `str`,
//!   `tuple`, `type`
//! - `functions` - `fail`, `len`, `print`, `range`

pub mod conversion;
pub mod functions;

use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;

use crate::runtime::function::{Builtin, NativeFunction};
use crate::runtime::value::Value;

/// Names of the universe.
pub const UNIVERSE: &[&str] = &[
    "None", "True", "False", "bool", "dict", "fail", "float", "int", "len", "list", "print", "range", "repr",
    "str", "tuple", "type",
];

static UNIVERSE_VALUES: LazyLock<FxHashMap<&'static str, Value>> = LazyLock::new(|| {
    let mut values = FxHashMap::default();
    values.insert("None", Value::None);
    values.insert("True", Value::Bool(true));
    values.insert("False", Value::Bool(false));

    let natives: [(&'static str, NativeFunction); 13] = [
        ("bool", conversion::bool_),
        ("dict", conversion::dict),
        ("float", conversion::float),
        ("int", conversion::int),
        ("list", conversion::list),
        ("repr", conversion::repr),
        ("str", conversion::str_),
        ("tuple", conversion::tuple),
        ("type", conversion::type_),
        ("fail", functions::fail),
        ("len", functions::len),
        ("print", functions::print),
        ("range", functions::range),
    ];
    for (name, func) in natives {
        values.insert(name, Value::Builtin(Arc::new(Builtin { name, func })));
    }
    values
});

/// Reports whether `name` is a universe name.
pub fn is_universal(name: &str) -> bool {
    UNIVERSE.contains(&name)
}

/// Returns the value of a universe name.
pub fn universe_value(name: &str) -> Option<Value> {
    UNIVERSE_VALUES.get(name).cloned()
}
