use pkdb_model::{ModelError, RecordId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("study references do not resolve: {0}")]
    References(#[from] ModelError),

    /// First rejected record when failing fast.
    #[error("{record}: {message}")]
    Rejected { record: RecordId, message: String },

    #[error("pipeline step `{step}` failed: {message}")]
    Step { step: String, message: String },
}
