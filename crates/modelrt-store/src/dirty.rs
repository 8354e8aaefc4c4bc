//! Dirty-field tracking: model -> record -> set of dirty field tokens, plus
//! an ordered list of first-modification entries used to drive deterministic
//! flush emission order.

use std::collections::{HashMap, HashSet};

use modelrt_core::{FieldTokenId, ModelTokenId, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyEntry {
    pub model: ModelTokenId,
    pub id: RecordId,
    pub field: FieldTokenId,
}

#[derive(Debug, Default)]
pub struct DirtySet {
    by_record: HashMap<ModelTokenId, HashMap<RecordId, HashSet<FieldTokenId>>>,
    order: Vec<DirtyEntry>,
}

impl DirtySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marking an already-dirty field is a no-op for the order list.
    pub fn mark_dirty(&mut self, model: ModelTokenId, id: RecordId, field: FieldTokenId) {
        let fields = self.by_record.entry(model).or_default().entry(id).or_default();
        if fields.insert(field) {
            self.order.push(DirtyEntry { model, id, field });
        }
    }

    #[must_use]
    pub fn get_dirty_fields(&self, model: ModelTokenId, id: RecordId) -> Vec<FieldTokenId> {
        self.by_record
            .get(&model)
            .and_then(|recs| recs.get(&id))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Removes the record's dirty entry and every order-list entry for it.
    pub fn clear_dirty(&mut self, model: ModelTokenId, id: RecordId) {
        if let Some(recs) = self.by_record.get_mut(&model) {
            recs.remove(&id);
        }
        self.order.retain(|e| !(e.model == model && e.id == id));
    }

    #[must_use]
    pub fn get_dirty_records(&self, model: ModelTokenId) -> Vec<RecordId> {
        self.by_record
            .get(&model)
            .map(|recs| recs.keys().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get_dirty_models(&self) -> Vec<ModelTokenId> {
        self.by_record
            .iter()
            .filter(|(_, recs)| !recs.is_empty())
            .map(|(m, _)| *m)
            .collect()
    }

    #[must_use]
    pub fn has_dirty(&self) -> bool {
        self.by_record.values().any(|recs| !recs.is_empty())
    }

    pub fn clear_all_dirty(&mut self) {
        self.by_record.clear();
        self.order.clear();
    }

    /// First-modification order across every dirty (model, id, field),
    /// consumed by flush to decide emission order.
    #[must_use]
    pub fn write_order(&self) -> &[DirtyEntry] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk() -> (ModelTokenId, RecordId, FieldTokenId) {
        (ModelTokenId(1), RecordId(1), FieldTokenId(1))
    }

    #[test]
    fn marking_twice_does_not_duplicate_order_entry() {
        let mut dirty = DirtySet::new();
        let (m, id, f) = mk();
        dirty.mark_dirty(m, id, f);
        dirty.mark_dirty(m, id, f);
        assert_eq!(dirty.write_order().len(), 1);
    }

    #[test]
    fn clear_dirty_removes_record_and_order_entries() {
        let mut dirty = DirtySet::new();
        let (m, id, f) = mk();
        dirty.mark_dirty(m, id, f);
        dirty.clear_dirty(m, id);
        assert!(dirty.get_dirty_fields(m, id).is_empty());
        assert!(dirty.write_order().is_empty());
    }

    #[test]
    fn has_dirty_reflects_state() {
        let mut dirty = DirtySet::new();
        let (m, id, f) = mk();
        assert!(!dirty.has_dirty());
        dirty.mark_dirty(m, id, f);
        assert!(dirty.has_dirty());
    }
}
