//! Dynamically typed parameter values and the ordered maps that carry them.
//!
//! Parameters arrive as text (the `key=value` string), as JSON (the parameter
//! file) or as already-typed overrides. [`ParamValue`] is the common currency;
//! [`ParamMap`] keeps entries in insertion order so that merged maps render
//! the same way every time.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    /// Ordered key/value pairs. Keys are scalars (class weights use `{0: 1.0}`).
    Map(Vec<(ParamValue, ParamValue)>),
}

impl ParamValue {
    /// Short type name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "str",
            ParamValue::List(_) => "list",
            ParamValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ParamValue::List(_) | ParamValue::Map(_))
    }

    /// Unquoted text form. Strings come back verbatim, everything else uses
    /// its display rendering.
    pub fn to_text(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn format_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        write!(f, "nan")
    } else if x.is_infinite() {
        write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug keeps the trailing ".0" so floats never read as ints
        write!(f, "{:?}", x)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => format_float(f, *x),
            ParamValue::Str(s) => write!(f, "{:?}", s),
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ParamValue::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Null => serializer.serialize_unit(),
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Int(i) => serializer.serialize_i64(*i),
            ParamValue::Float(x) => serializer.serialize_f64(*x),
            ParamValue::Str(s) => serializer.serialize_str(s),
            ParamValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ParamValue::Map(pairs) => {
                // JSON object keys must be strings
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (k, v) in pairs {
                    map.serialize_entry(&k.to_text(), v)?;
                }
                map.end()
            }
        }
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Int(i),
                None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ParamValue::Str(s),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => ParamValue::Map(
                map.into_iter()
                    .map(|(k, v)| (ParamValue::Str(k), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Int(i as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered map from parameter name to value.
///
/// Inserting an existing key replaces its value but keeps its original
/// position, so merging sources is last-write-wins without reordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMap<V = ParamValue> {
    entries: Vec<(String, V)>,
}

impl<V> Default for ParamMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> ParamMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous value if the key existed.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`, with `other` winning on collisions.
    pub fn merge(&mut self, other: ParamMap<V>) {
        for (key, value) in other {
            self.insert(key, value);
        }
    }
}

impl<V> FromIterator<(String, V)> for ParamMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for ParamMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<V: Serialize> Serialize for ParamMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn write_entries<'a, V: 'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a str, &'a V)>,
    mut render: impl FnMut(&mut fmt::Formatter<'_>, &V) -> fmt::Result,
) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{:?}: ", key)?;
        render(f, value)?;
    }
    write!(f, "}}")
}

impl fmt::Display for ParamMap<ParamValue> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_entries(f, self.iter(), |f, v| write!(f, "{}", v))
    }
}

impl fmt::Display for ParamMap<Vec<ParamValue>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_entries(f, self.iter(), |f, values| {
            write!(f, "{}", ParamValue::List(values.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut map = ParamMap::new();
        map.insert("a", ParamValue::Int(1));
        map.insert("b", ParamValue::Int(2));
        let old = map.insert("a", ParamValue::Int(3));

        assert_eq!(old, Some(ParamValue::Int(1)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&ParamValue::Int(3)));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut base: ParamMap = [("a".to_string(), ParamValue::Int(1))].into_iter().collect();
        let over: ParamMap = [
            ("a".to_string(), ParamValue::from("2")),
            ("c".to_string(), ParamValue::Bool(true)),
        ]
        .into_iter()
        .collect();
        base.merge(over);

        assert_eq!(base.get("a"), Some(&ParamValue::from("2")));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_display_is_deterministic() {
        let mut map = ParamMap::new();
        map.insert("lr", ParamValue::Float(3.0));
        map.insert("name", ParamValue::from("gbdt"));
        map.insert(
            "class_weight",
            ParamValue::Map(vec![(ParamValue::Int(0), ParamValue::Float(0.5))]),
        );
        assert_eq!(
            map.to_string(),
            r#"{"lr": 3.0, "name": "gbdt", "class_weight": {0: 0.5}}"#
        );
    }

    #[test]
    fn test_from_json_keeps_int_and_float_apart() {
        let json: serde_json::Value = serde_json::from_str(r#"{"a": 1, "b": 1.5}"#).unwrap();
        let value = ParamValue::from(json);
        let ParamValue::Map(pairs) = value else {
            panic!("expected map");
        };
        assert_eq!(pairs[0].1, ParamValue::Int(1));
        assert_eq!(pairs[1].1, ParamValue::Float(1.5));
    }

    #[test]
    fn test_serialize_map_keys_as_text() {
        let value = ParamValue::Map(vec![(ParamValue::Int(1), ParamValue::Int(5))]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"1":5}"#);
    }
}
