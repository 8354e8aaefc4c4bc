//! Model-level schema: field map plus the computed-field dependency graph.

use std::collections::HashMap;

use modelrt_core::{Error, ModelToken, Result};

use crate::field::{ComputeDescriptor, FieldSchema, ValueKind};

/// Schema for a single model: its fields in declaration order, and the
/// forward/reverse maps that drive compute-field invalidation.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    pub name: String,
    pub token: ModelToken,
    pub mixins: Vec<String>,
    field_order: Vec<String>,
    fields: HashMap<String, FieldSchema>,
    computed: Vec<String>,
    stored_computed: Vec<String>,
    /// field name -> names of computed fields that depend on it
    dependents: HashMap<String, Vec<String>>,
    /// computed field name -> names of the fields it depends on
    dependencies: HashMap<String, Vec<String>>,
}

impl ModelSchema {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            token: ModelToken::new(name),
            mixins: Vec::new(),
            field_order: Vec::new(),
            fields: HashMap::new(),
            computed: Vec::new(),
            stored_computed: Vec::new(),
            dependents: HashMap::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Registers a field. The first registration for a given name wins;
    /// later registrations (e.g. from a different mixin re-declaring the
    /// same name) are silently ignored.
    pub fn register_field(&mut self, field: FieldSchema) {
        if self.fields.contains_key(&field.name) {
            return;
        }
        if !self.mixins.contains(&field.declaring_mixin) {
            self.mixins.push(field.declaring_mixin.clone());
        }
        self.field_order.push(field.name.clone());
        self.fields.insert(field.name.clone(), field);
    }

    /// Marks `field` as computed from `deps`, updating both the forward
    /// (computed -> deps) and reverse (dep -> dependents) maps.
    pub fn register_computed_field(
        &mut self,
        field: &str,
        compute: ComputeDescriptor,
    ) -> Result<()> {
        let deps = compute.dependencies.clone();
        let is_stored = compute.is_stored;
        let entry = self
            .fields
            .get_mut(field)
            .ok_or_else(|| Error::UnknownField {
                model: self.name.clone(),
                field: field.to_owned(),
            })?;
        entry.compute = Some(compute);

        if !self.computed.contains(&field.to_owned()) {
            self.computed.push(field.to_owned());
        }
        if is_stored && !self.stored_computed.contains(&field.to_owned()) {
            self.stored_computed.push(field.to_owned());
        }
        self.dependencies
            .insert(field.to_owned(), deps.clone());
        for dep in deps {
            self.dependents
                .entry(dep)
                .or_default()
                .push(field.to_owned());
        }
        Ok(())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn fields_in_order(&self) -> impl Iterator<Item = &FieldSchema> {
        self.field_order.iter().filter_map(|n| self.fields.get(n))
    }

    #[must_use]
    pub fn computed_fields(&self) -> &[String] {
        &self.computed
    }

    #[must_use]
    pub fn stored_computed_fields(&self) -> &[String] {
        &self.stored_computed
    }

    /// One-step dependents of `field`: the computed fields whose declared
    /// dependencies include `field`. Unknown fields yield an empty slice,
    /// never an error.
    #[must_use]
    pub fn dependents_of(&self, field: &str) -> &[String] {
        self.dependents.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn dependencies_of(&self, field: &str) -> &[String] {
        self.dependencies.get(field).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_of_same_name_is_ignored() {
        let mut schema = ModelSchema::new("res.partner");
        schema.register_field(FieldSchema::new("name", ValueKind::Text, "base").required(true));
        schema.register_field(FieldSchema::new("name", ValueKind::Text, "other_mixin").required(false));
        assert!(schema.field("name").unwrap().required);
    }

    #[test]
    fn dependents_of_unknown_field_is_empty() {
        let schema = ModelSchema::new("res.partner");
        assert!(schema.dependents_of("nope").is_empty());
    }

    #[test]
    fn registering_computed_field_populates_reverse_map() {
        let mut schema = ModelSchema::new("res.partner");
        schema.register_field(FieldSchema::new("name", ValueKind::Text, "base"));
        schema.register_field(FieldSchema::new("is_company", ValueKind::Bool, "base"));
        schema.register_field(FieldSchema::new("display_name", ValueKind::Text, "base"));
        schema
            .register_computed_field(
                "display_name",
                ComputeDescriptor {
                    is_stored: false,
                    compute_method_name: "_compute_display_name".into(),
                    dependencies: vec!["name".into(), "is_company".into()],
                    inverse_method_name: None,
                    related_path: None,
                    tracking: false,
                },
            )
            .unwrap();
        assert_eq!(schema.dependents_of("name"), &["display_name".to_owned()]);
        assert_eq!(schema.dependents_of("is_company"), &["display_name".to_owned()]);
    }
}
