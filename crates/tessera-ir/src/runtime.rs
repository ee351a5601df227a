//! Runtime values, thrown exceptions, and captured object state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::literal::Literal;
use crate::typename::{simple_name, PrimitiveKind};

/// Handle to an object living inside a [`crate::introspect::RuntimeSession`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: u64,
    /// Dynamic (runtime) type.
    pub type_name: String,
}

/// A value produced by executing a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool { value: bool },
    Char { value: char },
    Int { value: i64 },
    Float { value: f64 },
    Str { value: String },
    Array { element: String, items: Vec<Value> },
    Enum { type_name: String, constant: String },
    Object(ObjectRef),
}

impl Value {
    /// The value a literal statement of `type_name` produces.
    pub fn from_literal(literal: &Literal, type_name: &str) -> Value {
        let floating = PrimitiveKind::of(type_name).is_some_and(PrimitiveKind::is_floating);
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool { value: *b },
            Literal::Char(c) => Value::Char { value: *c },
            Literal::Int(i) if floating => Value::Float { value: *i as f64 },
            Literal::Int(i) => Value::Int { value: *i },
            Literal::Float(f) => Value::Float { value: *f },
            Literal::Str(s) => Value::Str { value: s.clone() },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Runtime type of a reference value; `None` for primitives and null.
    pub fn dynamic_type(&self) -> Option<String> {
        match self {
            Value::Object(obj) => Some(obj.type_name.clone()),
            Value::Enum { type_name, .. } => Some(type_name.clone()),
            Value::Array { element, .. } => Some(format!("{element}[]")),
            _ => None,
        }
    }

    /// Snapshot of this value suitable for comparison across runs.
    pub fn observe(&self) -> ObservedValue {
        match self {
            Value::Null => ObservedValue::Literal(Literal::Null),
            Value::Bool { value } => ObservedValue::Literal(Literal::Bool(*value)),
            Value::Char { value } => ObservedValue::Literal(Literal::Char(*value)),
            Value::Int { value } => ObservedValue::Literal(Literal::Int(*value)),
            Value::Float { value } => ObservedValue::Literal(Literal::Float(*value)),
            Value::Str { value } => ObservedValue::Literal(Literal::Str(value.clone())),
            Value::Array { element, items } => ObservedValue::Array {
                element: element.clone(),
                items: items.iter().map(Value::observe).collect(),
            },
            Value::Enum {
                type_name,
                constant,
            } => ObservedValue::Enum {
                type_name: type_name.clone(),
                constant: constant.clone(),
            },
            Value::Object(obj) => ObservedValue::Object {
                type_name: obj.type_name.clone(),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool { value } => write!(f, "{value}"),
            Value::Char { value } => write!(f, "'{value}'"),
            Value::Int { value } => write!(f, "{value}"),
            Value::Float { value } => write!(f, "{value}"),
            Value::Str { value } => write!(f, "{value:?}"),
            Value::Array { element, items } => write!(f, "{element}[{}]", items.len()),
            Value::Enum {
                type_name,
                constant,
            } => write!(f, "{}.{constant}", simple_name(type_name)),
            Value::Object(obj) => write!(f, "{}@{}", simple_name(&obj.type_name), obj.id),
        }
    }
}

// ── Exceptions ───────────────────────────────────────────────────────

/// Immediate cause of a thrown exception (one level only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseInfo {
    pub type_name: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// An exception raised by an invoked operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thrown {
    pub type_name: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cause: Option<CauseInfo>,
}

impl Thrown {
    pub fn new(type_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message,
            cause: None,
        }
    }

    pub fn with_cause(mut self, type_name: impl Into<String>, message: Option<String>) -> Self {
        self.cause = Some(CauseInfo {
            type_name: type_name.into(),
            message,
        });
        self
    }

    pub fn simple_name(&self) -> String {
        simple_name(&self.type_name)
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " (caused by {}", cause.type_name)?;
            if let Some(msg) = &cause.message {
                write!(f, ": {msg}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl std::error::Error for Thrown {}

// ── Observed state ───────────────────────────────────────────────────

/// A captured value. Floats compare by bit pattern (via [`Literal`]) so a
/// `NaN` field is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObservedValue {
    Literal(Literal),
    Enum {
        type_name: String,
        constant: String,
    },
    Array {
        element: String,
        items: Vec<ObservedValue>,
    },
    /// A nested object; only its runtime type is recorded.
    Object {
        type_name: String,
    },
}

impl ObservedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ObservedValue::Literal(Literal::Null))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedField {
    pub declared_type: String,
    pub value: ObservedValue,
    /// Accessor used to read a non-public field; `None` for public fields.
    #[serde(default)]
    pub accessor: Option<String>,
}

impl ObservedField {
    /// Read through an accessor rather than directly.
    pub fn is_derived(&self) -> bool {
        self.accessor.is_some()
    }
}

/// Directly observable state of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    /// Runtime type of the object.
    pub type_name: String,
    pub fields: BTreeMap<String, ObservedField>,
}

impl ObservedState {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only fields present in `other` with an identical value.
    pub fn retain_matching(&mut self, other: &ObservedState) {
        self.fields
            .retain(|name, field| other.fields.get(name) == Some(field));
    }
}
