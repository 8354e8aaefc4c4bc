//! Deterministic identity tokens for models and fields.
//!
//! A token is a polynomial hash of a canonical name (e.g. `"res.partner"`,
//! `"display_name"`). Equality and hashing operate on the integer only; the
//! name is carried solely for `Debug` output, so two tokens built from the
//! same string always compare equal regardless of whether the name is kept
//! around.

use std::hash::{Hash, Hasher};

const HASH_BASE: u64 = 31;

fn hash_name(name: &str) -> u64 {
    let mut h: u64 = 5381;
    for b in name.as_bytes() {
        h = h.wrapping_mul(HASH_BASE).wrapping_add(u64::from(*b));
    }
    h
}

/// Identity token for a model (e.g. `res.partner`).
#[derive(Clone)]
pub struct ModelToken {
    id: u64,
    name: Option<String>,
}

impl ModelToken {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: hash_name(name),
            name: Some(name.to_owned()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Sentinel token for the abstract `"model"` fallback used when no
    /// pipeline is registered for a specific model.
    #[must_use]
    pub fn abstract_model() -> Self {
        Self::new("model")
    }
}

impl PartialEq for ModelToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for ModelToken {}

impl Hash for ModelToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for ModelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(n) => write!(f, "ModelToken({n:?} #{})", self.id),
            None => write!(f, "ModelToken(#{})", self.id),
        }
    }
}

/// The bare integer identity of a `ModelToken`, usable as a map key without
/// carrying the debug name around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelTokenId(pub u64);

impl From<&ModelToken> for ModelTokenId {
    fn from(t: &ModelToken) -> Self {
        ModelTokenId(t.id)
    }
}

/// Identity token for a field within a model (e.g. `display_name`).
#[derive(Clone)]
pub struct FieldToken {
    id: u64,
    name: Option<String>,
}

impl FieldToken {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: hash_name(name),
            name: Some(name.to_owned()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for FieldToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for FieldToken {}

impl Hash for FieldToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for FieldToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(n) => write!(f, "FieldToken({n:?} #{})", self.id),
            None => write!(f, "FieldToken(#{})", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldTokenId(pub u64);

impl From<&FieldToken> for FieldTokenId {
    fn from(t: &FieldToken) -> Self {
        FieldTokenId(t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_id() {
        assert_eq!(ModelToken::new("res.partner").id(), ModelToken::new("res.partner").id());
    }

    #[test]
    fn different_name_different_id() {
        assert_ne!(ModelToken::new("res.partner").id(), ModelToken::new("res.company").id());
    }

    #[test]
    fn abstract_model_is_stable() {
        assert_eq!(ModelToken::abstract_model().id(), ModelToken::new("model").id());
    }

    #[test]
    fn field_token_ignores_name_for_equality() {
        let a = FieldToken::new("display_name");
        let b = FieldToken {
            id: a.id(),
            name: None,
        };
        assert_eq!(a, b);
    }
}
