//! Core types shared across the runtime: identity tokens, record ids, the
//! dynamic field value, and the error type.

pub mod error;
pub mod ids;
pub mod tokens;
pub mod value;

pub use error::{Error, Result};
pub use ids::RecordId;
pub use tokens::{FieldToken, FieldTokenId, ModelToken, ModelTokenId};
pub use value::FieldValue;
