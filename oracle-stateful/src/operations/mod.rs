//! Operations against a keyed CRUD resource, and sequences of them

pub mod decoder;

use std::collections::BTreeMap;
use std::fmt;

/// Field name for the display name carried by Create payloads
pub const FIELD_NAME: &str = "name";
/// Field name for the contact number carried by Create and Update payloads
pub const FIELD_CONTACT_NUMBER: &str = "contact_number";

/// An ordered set of named text fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Payload {
    fields: BTreeMap<String, String>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// This payload with every field of `patch` written over it
    pub fn overlaid(&self, patch: &Payload) -> Payload {
        let mut merged = self.clone();
        for (field, value) in patch.iter() {
            merged.insert(field, value);
        }
        merged
    }

    /// First field on which `self` and `other` disagree, in field order.
    ///
    /// Returns the field name with both sides' values; a missing field is `None`.
    pub fn first_difference<'a>(
        &'a self,
        other: &'a Payload,
    ) -> Option<(&'a str, Option<&'a str>, Option<&'a str>)> {
        let mut names: Vec<&str> = self
            .fields
            .keys()
            .chain(other.fields.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();

        names.into_iter().find_map(|name| {
            let left = self.get(name);
            let right = other.get(name);
            (left != right).then_some((name, left, right))
        })
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", field, value)?;
        }
        write!(f, "}}")
    }
}

/// The four CRUD verbs in decode-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Opcode {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Create => write!(f, "Create"),
            Opcode::Read => write!(f, "Read"),
            Opcode::Update => write!(f, "Update"),
            Opcode::Delete => write!(f, "Delete"),
        }
    }
}

/// One decoded unit of work against the resource identified by `key`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Operation {
    Create { key: String, payload: Payload },
    Read { key: String },
    Update { key: String, payload: Payload },
    Delete { key: String },
}

impl Operation {
    pub fn key(&self) -> &str {
        match self {
            Operation::Create { key, .. }
            | Operation::Read { key }
            | Operation::Update { key, .. }
            | Operation::Delete { key } => key,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Operation::Create { .. } => Opcode::Create,
            Operation::Read { .. } => Opcode::Read,
            Operation::Update { .. } => Opcode::Update,
            Operation::Delete { .. } => Opcode::Delete,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Operation::Create { payload, .. } | Operation::Update { payload, .. } => Some(payload),
            Operation::Read { .. } | Operation::Delete { .. } => None,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> String {
        match self.payload() {
            Some(payload) => format!("{}({:?}, {})", self.opcode(), self.key(), payload),
            None => format!("{}({:?})", self.opcode(), self.key()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// A bounded sequence of operations that all target the same key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSequence {
    key: String,
    operations: Vec<Operation>,
}

impl OperationSequence {
    /// Create a new empty sequence for `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operations: Vec::new(),
        }
    }

    /// Add an operation to the sequence.
    ///
    /// Operations on a different key are a programming error in the caller
    /// and are refused.
    pub fn push(&mut self, op: Operation) -> bool {
        if op.key() != self.key {
            return false;
        }
        self.operations.push(op);
        true
    }

    /// The key every operation in this sequence targets
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn opcodes(&self) -> Vec<Opcode> {
        self.operations.iter().map(Operation::opcode).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
