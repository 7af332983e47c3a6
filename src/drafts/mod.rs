//! Reply drafting: synthesis, channel formatting, constraint correction,
//! confidence scoring and the generation orchestrator.

pub mod confidence;
pub mod constraints;
pub mod context;
pub mod format;
pub mod generator;
pub mod prompts;
pub mod synth;
pub mod types;

pub use generator::{DraftGenerator, GeneratorConfig};
pub use types::{
    Channel, Constraints, Draft, DraftOptions, DraftRequest, DraftResponse, EvaluationResult,
    Tone, Violation,
};
