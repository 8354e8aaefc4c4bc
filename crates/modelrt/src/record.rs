//! The single record wrapper type.
//!
//! There is no per-model generated wrapper: one `Record` carries a model
//! token and record id and resolves everything else (schema, store,
//! pipelines) through its environment. Equality is by (model, id), never by
//! which view produced the handle, matching the identity map's guarantee
//! that the same (model, id) always yields the same cached `Rc`.

use std::rc::Rc;

use modelrt_core::{Error, FieldValue, ModelToken, RecordId, Result};

use crate::environment::Environment;
use crate::values::Values;

pub struct RecordInner {
    pub(crate) env: Environment,
    pub(crate) model: ModelToken,
    pub(crate) id: RecordId,
}

/// A cheap-to-clone handle to one record: `(environment, model-token,
/// record-id)`. Cloning a `Record` clones the `Rc`, preserving identity.
pub type Record = Rc<RecordInner>;

impl RecordInner {
    /// Builds a bare wrapper. The only constructor available outside this
    /// crate: a registered factory that doesn't need a specialized wrapper
    /// type can build one of these directly and hand it to `Rc::new`.
    #[must_use]
    pub fn new(env: Environment, model: ModelToken, id: RecordId) -> Self {
        Self { env, model, id }
    }

    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    #[must_use]
    pub fn model(&self) -> &ModelToken {
        &self.model
    }

    /// Reads a field's current value straight from the store.
    #[must_use]
    pub fn get(&self, field: &str) -> FieldValue {
        self.env.read_field(&self.model, self.id, field)
    }

    /// Writes a single field. Inside a protecting scope for this field+id
    /// the write bypasses the pipeline (direct compute write); otherwise it
    /// is routed through the `"write"` pipeline like any other write.
    pub fn set(&self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        if self.env.is_protected(&self.model, self.id, field) {
            self.env.set_computed_value(&self.model, self.id, field, value)
        } else {
            let mut values = self.env.values_for(&self.model)?;
            values.set(field, value);
            self.env
                .write(&self.model, &[self.id], &values)
                .map(|_| ())
        }
    }
}

impl std::fmt::Debug for RecordInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model)
            .field("id", &self.id)
            .finish()
    }
}

impl PartialEq for RecordInner {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.id == other.id
    }
}

/// A set of records of the same model, returned by batch lookups and used
/// as the argument to batch `write`.
pub struct RecordSet {
    pub(crate) env: Environment,
    pub(crate) model: ModelToken,
    pub(crate) ids: Vec<RecordId>,
}

impl RecordSet {
    #[must_use]
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Fails with `NotSingleton` unless the set has exactly one record.
    pub fn ensure_one(&self) -> Result<Record> {
        if self.ids.len() != 1 {
            return Err(Error::NotSingleton {
                model: self.model.name().unwrap_or_default().to_owned(),
                count: self.ids.len(),
            });
        }
        Ok(self.env.get_record(&self.model, self.ids[0]))
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.ids.iter().map(|&id| self.env.get_record(&self.model, id))
    }

    pub fn write(&self, values: &Values) -> Result<bool> {
        self.env.write(&self.model, &self.ids, values)
    }
}
