use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to load configuration {path}: {source}")]
    Config {
        path: String,
        source: s2mosaic::Error,
    },

    #[error("{0}")]
    Acquisition(#[from] s2mosaic::Error),
}
