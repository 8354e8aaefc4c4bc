//! An in-process runtime for Odoo-style business objects: a columnar value
//! store, a base-plus-overrides method pipeline per `(model, method)`, and a
//! computed-field engine wired into both.
//!
//! There is no code generation and no per-model generated record type.
//! [`Environment`] is the single facade collaborators hold; it hands out
//! [`Record`]/[`RecordSet`] handles that resolve schema, storage, and
//! pipelines dynamically by name. A model is declared once via
//! `register_model`, gains behavior via `register_base`/`register_override`
//! keyed by `(model, method)`, and computed fields via
//! `register_computed_field` plus a `register_base`/`register_override` pair
//! on the compute method itself — the same override machinery business
//! methods use.
//!
//! ```ignore
//! use modelrt::Environment;
//!
//! let env = Environment::new();
//! // register_model("m.partner", ...), register_base(...), ...
//! let partner = env.create("m.partner", env.values_for(&model)?)?;
//! partner.get("display_name");
//! env.flush()?;
//! ```

pub mod environment;
pub mod handler;
pub mod record;
pub mod values;

pub use environment::{CreateArgs, Environment, WriteArgs};
pub use record::{Record, RecordInner, RecordSet};
pub use values::Values;

pub use modelrt_core::{
    Error, FieldToken, FieldTokenId, FieldValue, ModelToken, ModelTokenId, RecordId, Result,
};
pub use modelrt_pipeline::{OverrideFn, PipelineFn};
pub use modelrt_schema::field::ValueKind;
pub use modelrt_schema::{ComputeDescriptor, FieldSchema, ModelSchema};
pub use modelrt_session::ProtectionScope;
