use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Names of the fields every record carries
pub const RESERVED_FIELDS: [&str; 4] = ["name", "email", "age", "role"];

/// Upper bound (inclusive) for a valid age
pub const MAX_AGE: u8 = 150;

/// Stable row identifier, assigned by the collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Owned field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn view(&self) -> ValueRef<'_> {
        match self {
            Value::Number(n) => ValueRef::Number(*n),
            Value::Text(s) => ValueRef::Text(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.view().fmt(f)
    }
}

/// Borrowed view of a field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Number(f64),
    Text(&'a str),
}

impl ValueRef<'_> {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ValueRef::Number(n) => Some(*n),
            ValueRef::Text(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ValueRef::Number(n) => Value::Number(*n),
            ValueRef::Text(s) => Value::Text(s.to_string()),
        }
    }
}

impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display already drops the fraction for whole numbers
            ValueRef::Number(n) => write!(f, "{}", n),
            ValueRef::Text(s) => f.write_str(s),
        }
    }
}

/// One table row: the reserved fields plus whatever extra fields the
/// column set has introduced.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    pub name: String,
    pub email: String,
    pub age: u8,
    pub role: String,
    pub extra: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            age: 0,
            role: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_fields(
        id: RecordId,
        name: impl Into<String>,
        email: impl Into<String>,
        age: u8,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            age,
            role: role.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// Look up a field by name. `id` and the reserved fields are always present.
    pub fn get(&self, field: &str) -> Option<ValueRef<'_>> {
        match field {
            "id" => Some(ValueRef::Text(self.id.as_str())),
            "name" => Some(ValueRef::Text(&self.name)),
            "email" => Some(ValueRef::Text(&self.email)),
            "age" => Some(ValueRef::Number(f64::from(self.age))),
            "role" => Some(ValueRef::Text(&self.role)),
            other => self.extra.get(other).map(Value::view),
        }
    }

    /// Iterate over every field value, id first, in a fixed order
    pub fn values(&self) -> impl Iterator<Item = ValueRef<'_>> {
        [
            ValueRef::Text(self.id.as_str()),
            ValueRef::Text(&self.name),
            ValueRef::Text(&self.email),
            ValueRef::Number(f64::from(self.age)),
            ValueRef::Text(&self.role),
        ]
        .into_iter()
        .chain(self.extra.values().map(Value::view))
    }

    /// Snapshot every editable field into a patch (the staging buffer)
    pub fn to_patch(&self) -> RecordPatch {
        let mut patch = RecordPatch::new();
        patch.set("name", Value::text(&self.name));
        patch.set("email", Value::text(&self.email));
        patch.set("age", Value::Number(f64::from(self.age)));
        patch.set("role", Value::text(&self.role));
        for (k, v) in &self.extra {
            patch.set(k, v.clone());
        }
        patch
    }

    /// Merge a patch into this record.
    /// Returns the names of fields that were rejected and left untouched.
    pub fn apply(&mut self, patch: &RecordPatch) -> Vec<String> {
        let mut rejected = Vec::new();

        for (field, value) in &patch.fields {
            match field.as_str() {
                "id" => rejected.push(field.clone()),
                "name" => self.name = value.to_string(),
                "email" => self.email = value.to_string(),
                "role" => self.role = value.to_string(),
                "age" => match coerce_age(value) {
                    Some(age) => self.age = age,
                    None => rejected.push(field.clone()),
                },
                other => {
                    self.extra.insert(other.to_string(), value.clone());
                }
            }
        }

        rejected
    }
}

fn coerce_age(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => *n,
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
    };
    if n.fract() != 0.0 || !(0.0..=f64::from(MAX_AGE)).contains(&n) {
        return None;
    }
    Some(n as u8)
}

/// A partial set of field values, merged into a record by `update_row`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    fields: BTreeMap<String, Value>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Generates row ids of the form `<prefix>_<nonce>_<n>`.
///
/// The nonce is drawn once per generator so ids from separate generators
/// (separate imports, separate sessions) do not collide.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    nonce: u32,
    next: u64,
}

impl IdGenerator {
    pub fn new(prefix: &str) -> Self {
        let nonce = rand::thread_rng().gen();
        Self {
            prefix: prefix.to_string(),
            nonce,
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> RecordId {
        let id = RecordId(format!("{}_{:08x}_{}", self.prefix, self.nonce, self.next));
        self.next += 1;
        id
    }
}

impl Iterator for IdGenerator {
    type Item = RecordId;

    fn next(&mut self) -> Option<RecordId> {
        Some(self.next_id())
    }
}

/// The records a fresh session starts with
pub fn sample_records() -> Vec<Record> {
    vec![
        Record::with_fields("1".into(), "John Doe", "john@example.com", 30, "Developer"),
        Record::with_fields("2".into(), "Jane Smith", "jane@example.com", 28, "Designer"),
        Record::with_fields("3".into(), "Bob Johnson", "bob@example.com", 35, "Manager"),
        Record::with_fields("4".into(), "Alice Brown", "alice@example.com", 32, "Developer"),
        Record::with_fields("5".into(), "Charlie Wilson", "charlie@example.com", 29, "Analyst"),
    ]
}
