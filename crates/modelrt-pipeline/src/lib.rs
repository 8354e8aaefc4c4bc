//! Base + override method pipeline, with an abstract `"model"` fallback.

pub mod engine;

pub use engine::{OverrideFn, PipelineEngine, PipelineFn};
