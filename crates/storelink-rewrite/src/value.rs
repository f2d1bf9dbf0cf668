//! The value graph the rewriter walks.
//!
//! [`Value`] mirrors JSON with two additions: records are shared and carry
//! identity (so graphs may contain cycles), and [`Foreign`] wraps opaque
//! handles that happen to ride along with a payload and must never be walked.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::descriptor::Described;
use crate::error::RewriteError;

/// A node of a response payload.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Numeric leaf.
    Number(serde_json::Number),
    /// String leaf; the only kind of leaf that can hold a reference.
    String(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Shared, identity-bearing record.
    Object(Record),
    /// Opaque handle, passed through untouched.
    Foreign(Foreign),
}

impl Value {
    /// Project a serializable value into its plain-data form.
    ///
    /// Maps become untyped records.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if `value` cannot be represented.
    pub fn project<T: Serialize + ?Sized>(value: &T) -> Result<Self, RewriteError> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Project a described type; the top-level record is tagged with the
    /// type's kind so its reference fields are honored.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if `value` cannot be represented.
    pub fn project_described<T: Serialize + Described>(value: &T) -> Result<Self, RewriteError> {
        let projected = Self::project(value)?;
        if let Self::Object(record) = &projected {
            record.set_kind(Some(T::descriptor().kind().to_owned()));
        }
        Ok(projected)
    }

    /// The string, if this is a string leaf.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The record, if this is a record.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Object(r) => Some(r),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert back to JSON.
    ///
    /// A record reached twice along the same path (a cycle) cannot be
    /// represented; a record shared between branches is expanded at each
    /// place it appears.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::Cycle`] for cyclic graphs and
    /// [`RewriteError::Foreign`] when a foreign handle is present.
    pub fn to_json(&self) -> Result<serde_json::Value, RewriteError> {
        self.to_json_inner(&mut HashSet::new())
    }

    fn to_json_inner(
        &self,
        on_path: &mut HashSet<usize>,
    ) -> Result<serde_json::Value, RewriteError> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json_inner(on_path))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Object(record) => {
                let id = record.id();
                if !on_path.insert(id) {
                    return Err(RewriteError::Cycle);
                }
                let mut map = serde_json::Map::new();
                for (key, value) in record.fields() {
                    map.insert(key, value.to_json_inner(on_path)?);
                }
                on_path.remove(&id);
                serde_json::Value::Object(map)
            }
            Self::Foreign(handle) => {
                return Err(RewriteError::Foreign {
                    label: handle.label().to_owned(),
                });
            }
        })
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => Self::Object(Record::from_fields(
                None,
                map.into_iter().map(|(k, v)| (k, v.into())),
            )),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Foreign> for Value {
    fn from(value: Foreign) -> Self {
        Self::Foreign(value)
    }
}

#[derive(Default)]
struct RecordData {
    kind: Option<String>,
    fields: Vec<(String, Value)>,
}

/// A shared record with identity.
///
/// Cloning a `Record` clones the handle, not the contents: both handles see
/// the same fields and compare equal under [`Record::ptr_eq`]. Field order is
/// insertion order.
#[derive(Clone, Default)]
pub struct Record(Arc<RwLock<RecordData>>);

impl Record {
    /// An empty untyped record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty record of the given kind.
    pub fn typed(kind: impl Into<String>) -> Self {
        let record = Self::new();
        record.set_kind(Some(kind.into()));
        record
    }

    /// A record built from `fields`, in order.
    pub fn from_fields<I>(kind: Option<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self(Arc::new(RwLock::new(RecordData {
            kind,
            fields: fields.into_iter().collect(),
        })))
    }

    /// Identity of the record; equal for clones of the same handle.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Whether both handles point at the same record.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The record's kind; `None` for plain data.
    #[must_use]
    pub fn kind(&self) -> Option<String> {
        self.0.read().kind.clone()
    }

    /// Set or clear the kind.
    pub fn set_kind(&self, kind: Option<String>) {
        self.0.write().kind = kind;
    }

    /// Set `key` to `value`, replacing an existing field in place.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let mut data = self.0.write();
        match data.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => data.fields.push((key, value)),
        }
    }

    /// Builder-style [`Record::insert`].
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// A clone of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .read()
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.read().fields.is_empty()
    }

    /// A snapshot of all fields.
    #[must_use]
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.0.read().fields.clone()
    }

    /// Replace all fields at once.
    pub fn replace_fields(&self, fields: Vec<(String, Value)>) {
        self.0.write().fields = fields;
    }
}

/// Shallow: nested records would recurse forever on cycles.
impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.read();
        let keys: Vec<&str> = data.fields.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Record")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("kind", &data.kind)
            .field("fields", &keys)
            .finish()
    }
}

/// An opaque handle carried inside a payload.
#[derive(Clone)]
pub struct Foreign {
    label: String,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Foreign {
    /// Wrap `handle`, labelled for diagnostics.
    pub fn new<T: Any + Send + Sync>(label: impl Into<String>, handle: T) -> Self {
        Self {
            label: label.into(),
            handle: Arc::new(handle),
        }
    }

    /// Diagnostic label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The wrapped handle, if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }

    /// Whether both wrap the same handle.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Foreign").field(&self.label).finish()
    }
}
