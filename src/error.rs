use std::io;

/// All error types for bounds fitting, culling and the octree pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CullError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Ill-conditioned input: {0}")]
    IllConditioned(String),
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
    #[error("Contract violation: {0}")]
    Contract(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CullError>;
