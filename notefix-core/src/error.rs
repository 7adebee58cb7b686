use notefix_schema::SchemaError;
use thiserror::Error;

/// Top-level pipeline error. A schema error aborts before any scanning
/// with a distinct exit status; everything else is a runtime error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("{0:#}")]
    Runtime(#[from] anyhow::Error),
}

impl CoreError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CoreError::Schema(_) => crate::exit::SCHEMA_ERROR,
            CoreError::Runtime(_) => crate::exit::RUNTIME_ERROR,
        }
    }
}
