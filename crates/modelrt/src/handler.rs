//! The generic handler: applies a `Values` carrier to the store, marks the
//! persisted fields dirty, and fans out `modified` notifications.
//!
//! There is one dynamic handler rather than one generated handler per
//! model: nothing here needs per-field reflection because `Values` already
//! iterates in schema declaration order.

use modelrt_core::{Error, FieldTokenId, ModelTokenId, RecordId, Result};
use modelrt_schema::ModelSchema;
use modelrt_store::Store;

use crate::values::Values;

/// Writes every set field through to the store, in declaration order.
/// Fails with `NotWritable` if any set field isn't writable (readonly, or
/// a computed field with no inverse).
pub fn apply(
    values: &Values,
    store: &mut Store,
    schema: &ModelSchema,
    model: ModelTokenId,
    id: RecordId,
) -> Result<()> {
    for (name, value) in values.iter_set() {
        let field = schema.field(name).ok_or_else(|| Error::UnknownField {
            model: schema.name.clone(),
            field: name.to_owned(),
        })?;
        if !field.is_writable() {
            return Err(Error::NotWritable {
                model: schema.name.clone(),
                field: name.to_owned(),
            });
        }
        store.set(model, FieldTokenId::from(&field.token), id, value.clone());
    }
    Ok(())
}

pub fn apply_bulk(
    values: &Values,
    store: &mut Store,
    schema: &ModelSchema,
    model: ModelTokenId,
    ids: &[RecordId],
) -> Result<()> {
    for &id in ids {
        apply(values, store, schema, model, id)?;
    }
    Ok(())
}

/// Marks dirty every set field that is persisted: a plain field, or a
/// stored computed field. A non-stored computed field is never persisted.
pub fn mark_dirty(values: &Values, store: &mut Store, schema: &ModelSchema, model: ModelTokenId, id: RecordId) {
    for (name, _) in values.iter_set() {
        let Some(field) = schema.field(name) else {
            continue;
        };
        if field.compute.is_none() || field.is_stored_computed() {
            store.mark_dirty(model, id, FieldTokenId::from(&field.token));
        }
    }
}

/// The names of the fields `apply` would write through for this carrier, in
/// declaration order — used by the caller to drive `modified` afterward.
#[must_use]
pub fn set_field_names(values: &Values) -> Vec<String> {
    values.iter_set().map(|(name, _)| name.to_owned()).collect()
}
