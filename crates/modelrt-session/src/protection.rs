//! Protection scope: lets compute methods write their own result straight
//! into the store without retriggering the write pipeline.
//!
//! `protecting` returns a guard; while held, `is_protected` is true for
//! every (field, id) pair passed in. Scopes nest: overlapping acquisitions
//! union their sets, and each release only removes its own contribution, so
//! a pair stays protected as long as any enclosing scope still holds it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use modelrt_core::{FieldTokenId, RecordId};

#[derive(Debug, Default)]
struct ProtectionState {
    /// field -> id -> number of active scopes protecting that pair.
    counts: HashMap<FieldTokenId, HashMap<RecordId, u32>>,
}

impl ProtectionState {
    fn acquire(&mut self, fields: &[FieldTokenId], ids: &[RecordId]) {
        for &field in fields {
            let by_id = self.counts.entry(field).or_default();
            for &id in ids {
                *by_id.entry(id).or_insert(0) += 1;
            }
        }
    }

    fn release(&mut self, fields: &[FieldTokenId], ids: &[RecordId]) {
        for &field in fields {
            if let Some(by_id) = self.counts.get_mut(&field) {
                for &id in ids {
                    if let Some(count) = by_id.get_mut(&id) {
                        *count -= 1;
                        if *count == 0 {
                            by_id.remove(&id);
                        }
                    }
                }
                if by_id.is_empty() {
                    self.counts.remove(&field);
                }
            }
        }
    }

    fn is_protected(&self, field: FieldTokenId, id: RecordId) -> bool {
        self.counts
            .get(&field)
            .is_some_and(|by_id| by_id.contains_key(&id))
    }
}

/// Shared protection map, cloned (cheaply, via `Rc`) into every scope guard
/// so guards can release on drop regardless of how they're held.
#[derive(Debug, Default, Clone)]
pub struct ProtectionMap {
    state: Rc<RefCell<ProtectionState>>,
}

impl ProtectionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_protected(&self, field: FieldTokenId, id: RecordId) -> bool {
        self.state.borrow().is_protected(field, id)
    }

    /// Acquires protection for the cartesian product of `fields` x `ids`
    /// and returns a guard that releases the same set on drop.
    #[must_use]
    pub fn protecting(&self, fields: Vec<FieldTokenId>, ids: Vec<RecordId>) -> ProtectionScope {
        self.state.borrow_mut().acquire(&fields, &ids);
        ProtectionScope {
            map: self.clone(),
            fields,
            ids,
        }
    }
}

/// RAII guard releasing its fields/ids from the protection map on drop,
/// covering every exit path including early returns via `?`.
pub struct ProtectionScope {
    map: ProtectionMap,
    fields: Vec<FieldTokenId>,
    ids: Vec<RecordId>,
}

impl Drop for ProtectionScope {
    fn drop(&mut self) {
        self.map.state.borrow_mut().release(&self.fields, &self.ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_only_between_acquire_and_release() {
        let map = ProtectionMap::new();
        let field = FieldTokenId(1);
        let id = RecordId(1);
        assert!(!map.is_protected(field, id));
        {
            let _scope = map.protecting(vec![field], vec![id]);
            assert!(map.is_protected(field, id));
        }
        assert!(!map.is_protected(field, id));
    }

    #[test]
    fn nested_scopes_union_and_release_symmetrically() {
        let map = ProtectionMap::new();
        let field = FieldTokenId(1);
        let id = RecordId(1);
        let outer = map.protecting(vec![field], vec![id]);
        let inner = map.protecting(vec![field], vec![id]);
        assert!(map.is_protected(field, id));
        drop(inner);
        assert!(map.is_protected(field, id), "outer scope still holds it");
        drop(outer);
        assert!(!map.is_protected(field, id));
    }
}
