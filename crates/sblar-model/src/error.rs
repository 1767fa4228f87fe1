use thiserror::Error;

/// Terminal failure kinds for a validation run.
///
/// None of these are findings: a run either returns a complete findings
/// report or fails atomically with one of these.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A rule definition or evaluator misbehaved (empty id/name, unknown
    /// field, output misaligned with its input batch). Halts the run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable or structurally incompatible input.
    #[error("source read error for {path}: {message}")]
    SourceRead { path: String, message: String },

    /// Source could not be fetched after bounded retries.
    #[error("failed to fetch source {path} after {attempts} attempt(s): {message}")]
    UpstreamFetch {
        path: String,
        attempts: u32,
        message: String,
    },
}

impl ValidationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn source_read(path: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
