//! Keys and key paths
//!
//! A [`Key`] is one of the value kinds the engine accepts as a key: a number, a string, or an
//! array of keys. Keys are totally ordered the way the engine orders them:
//! every number sorts before every string, every string before every array, and arrays compare
//! element by element with a shorter prefix sorting first.
//!
//! A [`KeyPath`] names where a key lives inside a stored value, either a single dotted path
//! (`"author.id"`) or a sequence of paths producing an array key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::error::StoreError;

/// Largest integer a numeric key holds exactly (2^53 - 1)
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Number(f64),
    String(String),
    Array(Vec<Key>),
}

impl Key {
    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::String(_) => 1,
            Key::Array(_) => 2,
        }
    }

    /// NaN is not a valid key, at any depth
    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            Key::Number(n) if n.is_nan() => Err(StoreError::Data("NaN is not a valid key".into())),
            Key::Array(items) => items.iter().try_for_each(Key::validate),
            _ => Ok(()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Key::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Interpret a stored value as a key, if it is one
    pub fn from_json(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => n.as_f64().map(Key::Number),
            Value::String(s) => Some(Key::String(s.clone())),
            Value::Array(items) => items.iter().map(Key::from_json).collect::<Option<Vec<_>>>().map(Key::Array),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Key::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Value::from(*n as i64),
            Key::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            Key::String(s) => Value::String(s.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_json).collect()),
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::String(a), Key::String(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{}", n),
            Key::String(s) => write!(f, "{:?}", s),
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self { Key::Number(n) }
}
impl From<i64> for Key {
    fn from(n: i64) -> Self { Key::Number(n as f64) }
}
impl From<i32> for Key {
    fn from(n: i32) -> Self { Key::Number(n as f64) }
}
impl From<u32> for Key {
    fn from(n: u32) -> Self { Key::Number(n as f64) }
}
impl From<usize> for Key {
    fn from(n: usize) -> Self { Key::Number(n as f64) }
}
impl From<&str> for Key {
    fn from(s: &str) -> Self { Key::String(s.to_owned()) }
}
impl From<String> for Key {
    fn from(s: String) -> Self { Key::String(s) }
}
impl From<Vec<Key>> for Key {
    fn from(items: Vec<Key>) -> Self { Key::Array(items) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    Single(String),
    Compound(Vec<String>),
}

impl KeyPath {
    pub fn is_compound(&self) -> bool { matches!(self, KeyPath::Compound(_)) }

    /// The empty path addresses the whole value
    pub fn is_empty(&self) -> bool { matches!(self, KeyPath::Single(p) if p.is_empty()) }

    /// Extract the key this path selects from `value`
    pub fn evaluate(&self, value: &Value) -> Option<Key> {
        match self {
            KeyPath::Single(path) => lookup(value, path).and_then(Key::from_json),
            KeyPath::Compound(paths) => {
                paths.iter().map(|p| lookup(value, p).and_then(Key::from_json)).collect::<Option<Vec<_>>>().map(Key::Array)
            }
        }
    }

    /// Whether `value` has anything at all at this path, key or not
    pub fn resolves(&self, value: &Value) -> bool {
        match self {
            KeyPath::Single(path) => lookup(value, path).is_some(),
            KeyPath::Compound(paths) => paths.iter().all(|p| lookup(value, p).is_some()),
        }
    }

    /// Write a generated key into `value` at this path, creating intermediate objects.
    /// Only single, non-empty paths can receive a key.
    pub fn inject(&self, value: &mut Value, key: &Key) -> Result<(), StoreError> {
        let KeyPath::Single(path) = self else {
            return Err(StoreError::Data("cannot inject a key through a compound key path".into()));
        };
        if path.is_empty() {
            return Err(StoreError::Data("cannot inject a key through the empty key path".into()));
        }
        let mut segments = path.split('.').peekable();
        let mut current = value;
        while let Some(segment) = segments.next() {
            let Value::Object(map) = current else {
                return Err(StoreError::Data(format!("value at key path {} is not an object", path)));
            };
            if segments.peek().is_none() {
                map.insert(segment.to_owned(), key.to_json());
                return Ok(());
            }
            current = map.entry(segment.to_owned()).or_insert_with(|| Value::Object(Default::default()));
        }
        Ok(())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Single(path) => write!(f, "{}", path),
            KeyPath::Compound(paths) => write!(f, "[{}]", paths.join(", ")),
        }
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self { KeyPath::Single(path.to_owned()) }
}
impl From<String> for KeyPath {
    fn from(path: String) -> Self { KeyPath::Single(path) }
}
impl From<Vec<&str>> for KeyPath {
    fn from(paths: Vec<&str>) -> Self { KeyPath::Compound(paths.into_iter().map(str::to_owned).collect()) }
}
impl From<Vec<String>> for KeyPath {
    fn from(paths: Vec<String>) -> Self { KeyPath::Compound(paths) }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| current.as_object()?.get(segment))
}
