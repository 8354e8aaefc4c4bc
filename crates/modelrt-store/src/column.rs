//! Sparse, per-(model, field) typed columns.

use std::collections::HashMap;

use modelrt_core::{FieldTokenId, FieldValue, ModelTokenId, RecordId};

/// Key identifying a single column: one (model, field) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ColumnKey {
    model: ModelTokenId,
    field: FieldTokenId,
}

/// Columnar backing store: one sparse `RecordId -> FieldValue` map per
/// (model, field) pair. Absent entries read as `FieldValue::Null`,
/// mirroring each Rust type's zero/default.
#[derive(Debug, Default)]
pub struct ColumnStore {
    columns: HashMap<ColumnKey, HashMap<RecordId, FieldValue>>,
}

impl ColumnStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, model: ModelTokenId, field: FieldTokenId, id: RecordId) -> FieldValue {
        let key = ColumnKey { model, field };
        self.columns
            .get(&key)
            .and_then(|col| col.get(&id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&mut self, model: ModelTokenId, field: FieldTokenId, id: RecordId, value: FieldValue) {
        let key = ColumnKey { model, field };
        self.columns.entry(key).or_default().insert(id, value);
    }

    #[must_use]
    pub fn has(&self, model: ModelTokenId, field: FieldTokenId, id: RecordId) -> bool {
        let key = ColumnKey { model, field };
        self.columns.get(&key).is_some_and(|col| col.contains_key(&id))
    }

    /// Reads a contiguous span in input order; missing entries are default.
    #[must_use]
    pub fn get_column_span(
        &self,
        model: ModelTokenId,
        field: FieldTokenId,
        ids: &[RecordId],
    ) -> Vec<FieldValue> {
        ids.iter().map(|&id| self.get(model, field, id)).collect()
    }

    /// Pairwise assignment; panics on length mismatch (caller contract).
    pub fn set_column_values(
        &mut self,
        model: ModelTokenId,
        field: FieldTokenId,
        ids: &[RecordId],
        values: Vec<FieldValue>,
    ) {
        assert_eq!(ids.len(), values.len(), "ids/values length mismatch");
        for (&id, value) in ids.iter().zip(values) {
            self.set(model, field, id, value);
        }
    }

    /// Loads many values into one column at once, used by data-import or
    /// test-seeding collaborators.
    pub fn bulk_load(
        &mut self,
        model: ModelTokenId,
        field: FieldTokenId,
        values: HashMap<RecordId, FieldValue>,
    ) {
        let key = ColumnKey { model, field };
        self.columns.entry(key).or_default().extend(values);
    }

    /// Hint only; real prefetching is a collaborator's concern, so here it
    /// is a no-op that exists to keep call sites uniform.
    pub fn prefetch(&self, _model: ModelTokenId, _ids: &[RecordId], _fields: &[FieldTokenId]) {}

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    pub fn clear_model(&mut self, model: ModelTokenId) {
        self.columns.retain(|key, _| key.model != model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk(m: u64, f: u64) -> (ModelTokenId, FieldTokenId) {
        (ModelTokenId(m), FieldTokenId(f))
    }

    #[test]
    fn get_absent_returns_default() {
        let store = ColumnStore::new();
        let (m, f) = mk(1, 1);
        assert_eq!(store.get(m, f, RecordId(7)), FieldValue::Null);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut store = ColumnStore::new();
        let (m, f) = mk(1, 1);
        store.set(m, f, RecordId(7), FieldValue::Int(42));
        assert_eq!(store.get(m, f, RecordId(7)), FieldValue::Int(42));
    }

    #[test]
    fn span_fills_holes_with_default() {
        let mut store = ColumnStore::new();
        let (m, f) = mk(1, 1);
        store.set(m, f, RecordId(1), FieldValue::Int(10));
        let span = store.get_column_span(m, f, &[RecordId(1), RecordId(2)]);
        assert_eq!(span, vec![FieldValue::Int(10), FieldValue::Null]);
    }

    #[test]
    fn clear_model_only_drops_that_models_columns() {
        let mut store = ColumnStore::new();
        let (m1, f) = mk(1, 1);
        let (m2, _) = mk(2, 1);
        store.set(m1, f, RecordId(1), FieldValue::Int(1));
        store.set(m2, f, RecordId(1), FieldValue::Int(2));
        store.clear_model(m1);
        assert_eq!(store.get(m1, f, RecordId(1)), FieldValue::Null);
        assert_eq!(store.get(m2, f, RecordId(1)), FieldValue::Int(2));
    }
}
