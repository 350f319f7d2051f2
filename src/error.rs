use crate::types::Stage;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Cannot read input file '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Constraint violation: {message}")]
    Constraint { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Attach the pipeline stage the error surfaced in.
    pub fn in_stage(self, stage: Stage) -> Self {
        EtlError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Stage that failed, if this error was raised by the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EtlError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with any stage wrapping removed.
    pub fn root(&self) -> &EtlError {
        match self {
            EtlError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
