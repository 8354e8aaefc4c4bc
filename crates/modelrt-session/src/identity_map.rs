//! Identity map: guarantees a single cached wrapper per (model, id) so any
//! two lookups, regardless of which interface/view obtained them, return
//! the same object.

use std::collections::HashMap;

use modelrt_core::{ModelTokenId, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    model: ModelTokenId,
    id: RecordId,
}

/// Caches one wrapper per (model, id). `Wrapper` is expected to be a cheap
/// clone (e.g. `Rc<dyn Record>`) so cloning out of the map preserves
/// reference identity.
#[derive(Debug)]
pub struct IdentityMap<Wrapper> {
    entries: HashMap<Key, Wrapper>,
}

impl<Wrapper> Default for IdentityMap<Wrapper> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<Wrapper: Clone> IdentityMap<Wrapper> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, model: ModelTokenId, id: RecordId) -> Option<Wrapper> {
        self.entries.get(&Key { model, id }).cloned()
    }

    /// Returns the cached wrapper if present, otherwise builds one via
    /// `factory`, caches it, and returns it.
    pub fn get_or_insert(
        &mut self,
        model: ModelTokenId,
        id: RecordId,
        factory: impl FnOnce() -> Wrapper,
    ) -> Wrapper {
        self.entries
            .entry(Key { model, id })
            .or_insert_with(factory)
            .clone()
    }

    /// Registers a wrapper produced by a `create` path that already built
    /// one, so a subsequent `get` returns it rather than building anew.
    pub fn register(&mut self, model: ModelTokenId, id: RecordId, wrapper: Wrapper) {
        self.entries.insert(Key { model, id }, wrapper);
    }

    #[must_use]
    pub fn contains(&self, model: ModelTokenId, id: RecordId) -> bool {
        self.entries.contains_key(&Key { model, id })
    }

    pub fn remove(&mut self, model: ModelTokenId, id: RecordId) {
        self.entries.remove(&Key { model, id });
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn get_or_insert_returns_same_reference_on_second_call() {
        let mut map: IdentityMap<Rc<str>> = IdentityMap::new();
        let model = ModelTokenId(1);
        let id = RecordId(1);
        let first = map.get_or_insert(model, id, || Rc::from("wrapper"));
        let second = map.get_or_insert(model, id, || Rc::from("should not run"));
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn clear_all_drops_every_entry() {
        let mut map: IdentityMap<Rc<str>> = IdentityMap::new();
        map.register(ModelTokenId(1), RecordId(1), Rc::from("x"));
        map.clear_all();
        assert!(!map.contains(ModelTokenId(1), RecordId(1)));
    }
}
