//! Study ingestion: normalization of every record of a study, followed by
//! derivation of pharmacokinetic inputs from its concentration time courses.

pub mod context;
pub mod error;
pub mod pipeline;
pub mod pk;

pub use context::StudyContext;
pub use error::PipelineError;
pub use pipeline::{
    KindSummary, PipelineState, PkDerivationStep, ProcessingStep, ReferenceCheckStep,
    ScalarNormalizationStep, StudyPipeline, StudySummary, TimecourseNormalizationStep,
    build_default_pipeline, build_normalization_pipeline, normalize_record, resolve_count,
};
pub use pk::{PkBundleSummary, PkDerivationError, PkInputBundle, derive_pk_context};
