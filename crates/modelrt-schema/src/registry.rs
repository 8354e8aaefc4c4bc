//! Canonical source of models, fields, and record-wrapper factories.
//!
//! Generic over the facade's concrete environment (`Env`) and wrapper
//! (`Wrapper`) types so this crate never needs to know about them.

use std::collections::HashMap;
use std::sync::Arc;

use modelrt_core::{Error, ModelToken, ModelTokenId, RecordId, Result};

use crate::field::ComputeDescriptor;
use crate::model::ModelSchema;

/// A factory that builds a record wrapper for `(env, id)`. Factories are
/// registered in dependency order so the last registrant (the most-derived
/// mixin) wins.
pub type FactoryFn<Env, Wrapper> = Arc<dyn Fn(Env, RecordId) -> Wrapper + Send + Sync>;

pub struct SchemaRegistry<Env, Wrapper> {
    models: HashMap<String, ModelSchema>,
    factories: HashMap<String, FactoryFn<Env, Wrapper>>,
}

impl<Env, Wrapper> Default for SchemaRegistry<Env, Wrapper> {
    fn default() -> Self {
        Self {
            models: HashMap::new(),
            factories: HashMap::new(),
        }
    }
}

impl<Env, Wrapper> SchemaRegistry<Env, Wrapper> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model schema, or merges field declarations into an
    /// existing one under the same name (mixin composition).
    pub fn register_model(&mut self, schema: ModelSchema) {
        match self.models.get_mut(&schema.name) {
            None => {
                tracing::debug!(model = schema.name, "registered model");
                self.models.insert(schema.name.clone(), schema);
            }
            Some(existing) => {
                tracing::debug!(model = schema.name, "merging mixin fields into existing model");
                for field in schema.fields_in_order() {
                    existing.register_field(field.clone());
                }
            }
        }
    }

    #[must_use]
    pub fn get_model(&self, name: &str) -> Option<&ModelSchema> {
        self.models.get(name)
    }

    #[must_use]
    pub fn get_model_mut(&mut self, name: &str) -> Option<&mut ModelSchema> {
        self.models.get_mut(name)
    }

    #[must_use]
    pub fn token_for(&self, name: &str) -> Option<ModelToken> {
        self.models.get(name).map(|s| s.token.clone())
    }

    /// Reverse lookup from a token's bare id back to the canonical model
    /// name, used where only the id survived (e.g. the dirty-models list).
    #[must_use]
    pub fn token_for_id(&self, id: ModelTokenId) -> Option<String> {
        self.models
            .values()
            .find(|s| ModelTokenId::from(&s.token) == id)
            .map(|s| s.name.clone())
    }

    /// Idempotent last-writer-wins: the most recently registered factory
    /// for a model replaces any previous one.
    pub fn register_factory(&mut self, model: &str, factory: FactoryFn<Env, Wrapper>) {
        self.factories.insert(model.to_owned(), factory);
    }

    /// Fails with `UnknownModel` when no factory has been registered for
    /// this model (the registry has no concept of "model exists but has
    /// no factory"; that distinction is the caller's to make at `create`
    /// time, where it is reported as `NoFactory`).
    pub fn get_factory(&self, model: &str) -> Result<&FactoryFn<Env, Wrapper>> {
        self.factories
            .get(model)
            .ok_or_else(|| Error::UnknownModel {
                model: model.to_owned(),
            })
    }

    pub fn register_computed_field(
        &mut self,
        model: &str,
        field: &str,
        compute: ComputeDescriptor,
    ) -> Result<()> {
        let schema = self
            .models
            .get_mut(model)
            .ok_or_else(|| Error::UnknownModel {
                model: model.to_owned(),
            })?;
        schema.register_computed_field(field, compute)
    }

    /// One-step dependents of `(model, field)`, expressed as `(model, field)`
    /// pairs so callers don't need to special-case cross-model paths.
    /// Unknown model or field yields an empty vector, never an error.
    #[must_use]
    pub fn get_dependents(&self, model: &str, field: &str) -> Vec<(String, String)> {
        match self.models.get(model) {
            None => Vec::new(),
            Some(schema) => schema
                .dependents_of(field)
                .iter()
                .map(|f| (model.to_owned(), f.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_factory_lookup_fails() {
        let registry: SchemaRegistry<(), ()> = SchemaRegistry::new();
        assert!(matches!(
            registry.get_factory("res.partner"),
            Err(Error::UnknownModel { .. })
        ));
    }

    #[test]
    fn get_dependents_on_unknown_model_is_empty_not_error() {
        let registry: SchemaRegistry<(), ()> = SchemaRegistry::new();
        assert!(registry.get_dependents("res.partner", "name").is_empty());
    }
}
