//! Compute tracker: the recompute queue driven by `modified()`, with a
//! visited-bound fixpoint drain to detect pathological cycles.

use std::collections::{HashMap, HashSet};

use modelrt_core::{Error, FieldTokenId, ModelTokenId, RecordId, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RecordKey {
    model: ModelTokenId,
    id: RecordId,
}

/// Model -> record -> set of field tokens awaiting recomputation.
#[derive(Debug, Default)]
pub struct ComputeTracker {
    pending: HashMap<RecordKey, HashSet<FieldTokenId>>,
}

impl ComputeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_to_recompute(&mut self, model: ModelTokenId, id: RecordId, field: FieldTokenId) {
        self.pending
            .entry(RecordKey { model, id })
            .or_default()
            .insert(field);
    }

    #[must_use]
    pub fn needs_recompute(&self, model: ModelTokenId, id: RecordId, field: FieldTokenId) -> bool {
        self.pending
            .get(&RecordKey { model, id })
            .is_some_and(|set| set.contains(&field))
    }

    pub fn clear_recompute(&mut self, model: ModelTokenId, id: RecordId, field: FieldTokenId) {
        if let Some(set) = self.pending.get_mut(&RecordKey { model, id }) {
            set.remove(&field);
            if set.is_empty() {
                self.pending.remove(&RecordKey { model, id });
            }
        }
    }

    #[must_use]
    pub fn get_records_to_recompute(&self, model: ModelTokenId, field: FieldTokenId) -> Vec<RecordId> {
        self.pending
            .iter()
            .filter(|(key, fields)| key.model == model && fields.contains(&field))
            .map(|(key, _)| key.id)
            .collect()
    }

    #[must_use]
    pub fn get_fields_to_recompute(&self, model: ModelTokenId, id: RecordId) -> Vec<FieldTokenId> {
        self.pending
            .get(&RecordKey { model, id })
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get_all_pending_recompute(&self) -> Vec<(ModelTokenId, RecordId, FieldTokenId)> {
        self.pending
            .iter()
            .flat_map(|(key, fields)| fields.iter().map(move |f| (key.model, key.id, *f)))
            .collect()
    }

    #[must_use]
    pub fn has_pending_recompute(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn clear_all(&mut self) {
        self.pending.clear();
    }
}

/// Drains `tracker` by repeatedly calling `recompute_one(model, id, field)`
/// until no pending entries remain, bounding the loop with a visited set so
/// a compute that keeps re-marking the same (model, id, field) without ever
/// clearing it is reported as `ComputeCycle` instead of spinning forever.
///
/// `recompute_one` is responsible for clearing the flag it was given (in
/// practice via `set_computed_value`, which clears as part of the write);
/// a compute that marks new dependents appends them and the drain
/// continues until the queue is empty.
pub fn recompute_pending(
    tracker: &mut ComputeTracker,
    model_name: impl Fn(ModelTokenId) -> String,
    mut recompute_one: impl FnMut(&mut ComputeTracker, ModelTokenId, RecordId, FieldTokenId) -> Result<()>,
) -> Result<()> {
    let mut visited: HashSet<(ModelTokenId, RecordId, FieldTokenId)> = HashSet::new();
    loop {
        let pending = tracker.get_all_pending_recompute();
        let Some(&(model, id, field)) = pending.first() else {
            return Ok(());
        };
        if !visited.insert((model, id, field)) {
            let model = model_name(model);
            tracing::warn!(model, field = ?field, "compute cycle detected during recompute_pending");
            return Err(Error::ComputeCycle {
                model,
                field: format!("{field:?}"),
            });
        }
        recompute_one(tracker, model, id, field)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_then_needs_recompute_round_trips() {
        let mut tracker = ComputeTracker::new();
        let model = ModelTokenId(1);
        let id = RecordId(1);
        let field = FieldTokenId(1);
        tracker.mark_to_recompute(model, id, field);
        assert!(tracker.needs_recompute(model, id, field));
        tracker.clear_recompute(model, id, field);
        assert!(!tracker.needs_recompute(model, id, field));
    }

    #[test]
    fn recompute_pending_detects_cycle() {
        let mut tracker = ComputeTracker::new();
        let model = ModelTokenId(1);
        let id = RecordId(1);
        let field = FieldTokenId(1);
        tracker.mark_to_recompute(model, id, field);
        let result = recompute_pending(
            &mut tracker,
            |_| "m".to_owned(),
            |tracker, model, id, field| {
                tracker.mark_to_recompute(model, id, field);
                Ok(())
            },
        );
        assert!(matches!(result, Err(Error::ComputeCycle { .. })));
    }

    #[test]
    fn recompute_pending_drains_to_empty() {
        let mut tracker = ComputeTracker::new();
        let model = ModelTokenId(1);
        let id = RecordId(1);
        let field = FieldTokenId(1);
        tracker.mark_to_recompute(model, id, field);
        recompute_pending(&mut tracker, |_| "m".to_owned(), |tracker, model, id, field| {
            tracker.clear_recompute(model, id, field);
            Ok(())
        })
        .unwrap();
        assert!(!tracker.has_pending_recompute());
    }
}
