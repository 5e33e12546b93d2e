//! Materialized Lua table data, independent of any file format.
//!
//! Description files are plain table constructors, so the model only needs
//! scalars and tables. `Nil` is what a `nil` expression evaluates to; the
//! reader never stores it in a table, as in Lua. Float and boolean keys are
//! representable because the reader accepts them; the serializer rejects
//! them.

use std::fmt;

/// A value inside a description document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Table(Table),
}

impl Value {
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

/// A table key.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Name(String),
    Index(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(s) => write!(f, "{}", s),
            Key::Index(i) => write!(f, "[{}]", i),
            Key::Float(x) => write!(f, "[{:?}]", x),
            Key::Bool(b) => write!(f, "[{}]", b),
        }
    }
}

/// Insertion-ordered table with unique keys.
///
/// Equality is structural: two tables are equal when they hold the same
/// key/value pairs, in any order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<(Key, Value)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a positional list (`1..=n` keys).
    pub fn from_list(items: impl IntoIterator<Item = Value>) -> Self {
        let mut table = Table::new();
        for item in items {
            table.push(item);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_key(&Key::Name(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| matches!(k, Key::Name(n) if n == key))
            .map(|(_, v)| v)
    }

    pub fn get_key(&self, key: &Key) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Append at the next free positional index.
    pub fn push(&mut self, value: impl Into<Value>) {
        let next = self.next_index();
        self.insert(Key::Index(next), value);
    }

    /// Smallest `n >= 1` such that `[n]` is unset (Lua's border for
    /// constructor-built arrays).
    pub fn next_index(&self) -> i64 {
        let mut n = 1;
        while self.get_key(&Key::Index(n)).is_some() {
            n += 1;
        }
        n
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.remove_key(&Key::Name(key.to_string()))
    }

    pub fn remove_key(&mut self, key: &Key) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Key, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    /// True when the keys are exactly `1..=len`, in any order.
    pub fn is_sequence(&self) -> bool {
        let n = self.entries.len() as i64;
        self.entries
            .iter()
            .all(|(k, _)| matches!(k, Key::Index(i) if (1..=n).contains(i)))
    }

    /// Values in positional order, if this table is a sequence.
    pub fn sequence_values(&self) -> Option<Vec<&Value>> {
        if !self.is_sequence() {
            return None;
        }
        (1..=self.entries.len() as i64)
            .map(|i| self.get_key(&Key::Index(i)))
            .collect()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get_key(k) == Some(v))
    }
}
