use thiserror::Error;

/// Failure taxonomy for a pipeline run. Every variant names the stage that
/// failed and, where applicable, the source, file or chunk involved.
///
/// A run has a single failure boundary: the first error of any kind aborts
/// it. Chunks scheduled in parallel may already have been written when the
/// error surfaces; their output stays on disk (no rollback).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("listing source {source_path} failed: {cause:#}")]
    ListSource { source_path: String, cause: anyhow::Error },

    #[error("reading records from {file} failed: {cause:#}")]
    ReadFile { file: String, cause: anyhow::Error },

    #[error("mapper failed on {file} (source {source_path}): {cause:#}")]
    Map {
        source_path: String,
        file: String,
        cause: anyhow::Error,
    },

    #[error("reducer failed in chunk {chunk}: {cause:#}")]
    Reduce { chunk: usize, cause: anyhow::Error },

    #[error("serializer failed in chunk {chunk}: {cause:#}")]
    Serialize { chunk: usize, cause: anyhow::Error },

    #[error("writing chunk {chunk} failed: {cause:#}")]
    Write { chunk: usize, cause: anyhow::Error },
}
