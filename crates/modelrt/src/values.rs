//! The create/write payload carrier: one settable `(value, is_set)` slot per
//! writable model field, iterated in declaration order.

use std::collections::HashMap;

use modelrt_core::FieldValue;
use modelrt_schema::ModelSchema;

/// A mutable carrier pre-populated (unset) with every field the schema
/// declares, in declaration order, so iteration order never depends on the
/// order the caller happened to call `set` in.
#[derive(Debug, Clone)]
pub struct Values {
    // (field name, value, is_set), in schema declaration order.
    slots: Vec<(String, FieldValue, bool)>,
}

impl Values {
    #[must_use]
    pub fn new(schema: &ModelSchema) -> Self {
        Self {
            slots: schema
                .fields_in_order()
                .map(|f| (f.name.clone(), FieldValue::Null, false))
                .collect(),
        }
    }

    /// Sets a field by name; unknown names are ignored (the schema's field
    /// set is the only valid vocabulary for a carrier).
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        if let Some(slot) = self.slots.iter_mut().find(|(name, ..)| name == field) {
            slot.1 = value.into();
            slot.2 = true;
        }
    }

    #[must_use]
    pub fn is_set(&self, field: &str) -> bool {
        self.slots
            .iter()
            .find(|(name, ..)| name == field)
            .is_some_and(|(_, _, set)| *set)
    }

    /// Set fields only, in declaration order.
    pub fn iter_set(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.slots
            .iter()
            .filter(|(_, _, set)| *set)
            .map(|(name, value, _)| (name.as_str(), value))
    }

    /// Untyped dictionary view: set fields only.
    #[must_use]
    pub fn as_dict(&self) -> HashMap<String, FieldValue> {
        self.iter_set().map(|(k, v)| (k.to_owned(), v.clone())).collect()
    }

    /// Builds a carrier from an untyped dictionary for a scripting-bridge
    /// style caller: unknown keys are ignored, and a value whose kind
    /// doesn't match the field's declared kind is ignored rather than
    /// raising an error.
    #[must_use]
    pub fn from_dict(schema: &ModelSchema, dict: &HashMap<String, FieldValue>) -> Self {
        let mut values = Self::new(schema);
        for (key, value) in dict {
            if let Some(field) = schema.field(key) {
                if field.kind.accepts(value) {
                    values.set(key, value.clone());
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelrt_schema::{FieldSchema, field::ValueKind};

    fn partner_schema() -> ModelSchema {
        let mut schema = ModelSchema::new("m.partner");
        schema.register_field(FieldSchema::new("name", ValueKind::Text, "base"));
        schema.register_field(FieldSchema::new("is_company", ValueKind::Bool, "base"));
        schema
    }

    #[test]
    fn iteration_follows_declaration_order_not_call_order() {
        let schema = partner_schema();
        let mut values = Values::new(&schema);
        values.set("is_company", true);
        values.set("name", "Acme");
        let order: Vec<&str> = values.iter_set().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["name", "is_company"]);
    }

    #[test]
    fn from_dict_ignores_unknown_and_mismatched_keys() {
        let schema = partner_schema();
        let mut dict = HashMap::new();
        dict.insert("name".to_owned(), FieldValue::Text("Acme".into()));
        dict.insert("is_company".to_owned(), FieldValue::Text("nope".into()));
        dict.insert("ghost_field".to_owned(), FieldValue::Int(1));
        let values = Values::from_dict(&schema, &dict);
        assert!(values.is_set("name"));
        assert!(!values.is_set("is_company"));
        assert!(!values.is_set("ghost_field"));
    }
}
