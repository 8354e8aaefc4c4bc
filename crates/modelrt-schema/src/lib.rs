//! Canonical schema: model/field metadata, the computed-field dependency
//! graph, and record-wrapper factory lookup.

pub mod field;
pub mod model;
pub mod registry;

pub use field::{ComputeDescriptor, FieldSchema};
pub use model::ModelSchema;
pub use registry::{FactoryFn, SchemaRegistry};
