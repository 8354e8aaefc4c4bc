//! Field-level schema metadata.

use modelrt_core::{FieldToken, FieldValue};

/// The value kind a field accepts, used to reject type-mismatched input at
/// the untyped edges (`from_dict`) without throwing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
}

impl ValueKind {
    #[must_use]
    pub fn accepts(self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (ValueKind::Bool, FieldValue::Bool(_))
                | (ValueKind::Int, FieldValue::Int(_))
                | (ValueKind::Float, FieldValue::Float(_) | FieldValue::Int(_))
                | (ValueKind::Text, FieldValue::Text(_))
        ) || value.is_null()
    }
}

/// Compute metadata attached to a field whose value is derived from others.
#[derive(Debug, Clone)]
pub struct ComputeDescriptor {
    pub is_stored: bool,
    pub compute_method_name: String,
    pub dependencies: Vec<String>,
    pub inverse_method_name: Option<String>,
    pub related_path: Option<String>,
    pub tracking: bool,
}

/// Schema for a single field of a model.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub token: FieldToken,
    pub kind: ValueKind,
    pub read_only: bool,
    pub required: bool,
    pub declaring_mixin: String,
    pub compute: Option<ComputeDescriptor>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(name: &str, kind: ValueKind, declaring_mixin: &str) -> Self {
        Self {
            name: name.to_owned(),
            token: FieldToken::new(name),
            kind,
            read_only: false,
            required: false,
            declaring_mixin: declaring_mixin.to_owned(),
            compute: None,
        }
    }

    #[must_use]
    pub const fn read_only(mut self, v: bool) -> Self {
        self.read_only = v;
        self
    }

    #[must_use]
    pub const fn required(mut self, v: bool) -> Self {
        self.required = v;
        self
    }

    #[must_use]
    pub fn computed(mut self, compute: ComputeDescriptor) -> Self {
        self.compute = Some(compute);
        self
    }

    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.compute.is_some()
    }

    #[must_use]
    pub fn is_stored_computed(&self) -> bool {
        self.compute.as_ref().is_some_and(|c| c.is_stored)
    }

    /// A readonly computed field without an inverse method cannot be written
    /// through the pipeline.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        match &self.compute {
            None => !self.read_only,
            Some(c) => c.inverse_method_name.is_some(),
        }
    }
}
