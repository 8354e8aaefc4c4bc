//! Error types for the runtime.

use std::fmt;

/// The primary error type for all runtime operations.
#[derive(Debug)]
pub enum Error {
    /// No model is registered under this name.
    UnknownModel { model: String },
    /// The model has no field by this name.
    UnknownField { model: String, field: String },
    /// A model was declared but no factory was registered to build its wrapper.
    NoFactory { model: String },
    /// Nothing at all is registered for this (model, method) key, nor for the abstract fallback.
    NoPipeline { model: String, method: String },
    /// Overrides exist for this (model, method) but no base implementation was ever registered.
    MissingBase { model: String, method: String },
    /// A base (or override) called `super()` with nothing further down the chain.
    ChainExhausted { model: String, method: String },
    /// An operation that requires exactly one record was called on a different count.
    NotSingleton { model: String, count: usize },
    /// The field is not writable (computed, non-stored, or otherwise protected).
    NotWritable { model: String, field: String },
    /// A compute method attempted to write a record through the pipeline while that
    /// field was protected for that record.
    ReentrantWrite {
        model: String,
        field: String,
        id: u64,
    },
    /// Recomputing dependents did not reach a fixpoint within the visited bound.
    ComputeCycle { model: String, field: String },
    /// A caller-supplied argument was invalid.
    InvalidArgument { message: String },
    /// Catch-all for conditions with no dedicated variant.
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownModel { model } => write!(f, "unknown model '{model}'"),
            Error::UnknownField { model, field } => {
                write!(f, "model '{model}' has no field '{field}'")
            }
            Error::NoFactory { model } => {
                write!(f, "no wrapper factory registered for model '{model}'")
            }
            Error::NoPipeline { model, method } => {
                write!(f, "no pipeline registered for {model}.{method}")
            }
            Error::MissingBase { model, method } => write!(
                f,
                "{model}.{method} has overrides registered but no base implementation"
            ),
            Error::ChainExhausted { model, method } => {
                write!(f, "{model}.{method} called super() with no further override")
            }
            Error::NotSingleton { model, count } => write!(
                f,
                "expected exactly one '{model}' record, found {count}"
            ),
            Error::NotWritable { model, field } => {
                write!(f, "field '{model}.{field}' is not writable")
            }
            Error::ReentrantWrite { model, field, id } => write!(
                f,
                "reentrant write to protected field {model}.{field} on record {id}"
            ),
            Error::ComputeCycle { model, field } => write!(
                f,
                "compute dependency cycle detected at {model}.{field}"
            ),
            Error::InvalidArgument { message } => write!(f, "invalid argument: {message}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
