//! The combined columnar store: typed columns plus dirty tracking.
//!
//! Not thread-safe; an environment owns exactly one store.

use std::collections::HashMap;

use modelrt_core::{FieldTokenId, FieldValue, ModelTokenId, RecordId};

use crate::column::ColumnStore;
use crate::dirty::{DirtyEntry, DirtySet};

#[derive(Debug, Default)]
pub struct Store {
    columns: ColumnStore,
    dirty: DirtySet,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, model: ModelTokenId, field: FieldTokenId, id: RecordId) -> FieldValue {
        self.columns.get(model, field, id)
    }

    /// Writes through without touching dirty state; marking dirty is a
    /// higher-level decision made by the pipeline so compute methods can
    /// write results without queuing them for flush.
    pub fn set(&mut self, model: ModelTokenId, field: FieldTokenId, id: RecordId, value: FieldValue) {
        self.columns.set(model, field, id, value);
    }

    #[must_use]
    pub fn has(&self, model: ModelTokenId, field: FieldTokenId, id: RecordId) -> bool {
        self.columns.has(model, field, id)
    }

    #[must_use]
    pub fn get_column_span(
        &self,
        model: ModelTokenId,
        field: FieldTokenId,
        ids: &[RecordId],
    ) -> Vec<FieldValue> {
        self.columns.get_column_span(model, field, ids)
    }

    pub fn set_column_values(
        &mut self,
        model: ModelTokenId,
        field: FieldTokenId,
        ids: &[RecordId],
        values: Vec<FieldValue>,
    ) {
        self.columns.set_column_values(model, field, ids, values);
    }

    pub fn bulk_load(
        &mut self,
        model: ModelTokenId,
        field: FieldTokenId,
        values: HashMap<RecordId, FieldValue>,
    ) {
        self.columns.bulk_load(model, field, values);
    }

    pub fn prefetch(&self, model: ModelTokenId, ids: &[RecordId], fields: &[FieldTokenId]) {
        self.columns.prefetch(model, ids, fields);
    }

    pub fn mark_dirty(&mut self, model: ModelTokenId, id: RecordId, field: FieldTokenId) {
        self.dirty.mark_dirty(model, id, field);
    }

    #[must_use]
    pub fn get_dirty_fields(&self, model: ModelTokenId, id: RecordId) -> Vec<FieldTokenId> {
        self.dirty.get_dirty_fields(model, id)
    }

    pub fn clear_dirty(&mut self, model: ModelTokenId, id: RecordId) {
        self.dirty.clear_dirty(model, id);
    }

    #[must_use]
    pub fn get_dirty_records(&self, model: ModelTokenId) -> Vec<RecordId> {
        self.dirty.get_dirty_records(model)
    }

    #[must_use]
    pub fn get_dirty_models(&self) -> Vec<ModelTokenId> {
        self.dirty.get_dirty_models()
    }

    #[must_use]
    pub fn has_dirty(&self) -> bool {
        self.dirty.has_dirty()
    }

    pub fn clear_all_dirty(&mut self) {
        self.dirty.clear_all_dirty();
    }

    #[must_use]
    pub fn write_order(&self) -> &[DirtyEntry] {
        self.dirty.write_order()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.dirty.clear_all_dirty();
    }

    pub fn clear_model(&mut self, model: ModelTokenId) {
        self.columns.clear_model(model);
        for id in self.dirty.get_dirty_records(model) {
            self.dirty.clear_dirty(model, id);
        }
    }
}
