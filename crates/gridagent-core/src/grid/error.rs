//! Analysis session error types

use thiserror::Error;

/// Domain errors raised by the analysis session and engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("No network is currently loaded. Please create or load a network first.")]
    NoNetworkLoaded,

    #[error("Unsupported file format: {0}. Use .json or .p files.")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to load network: {0}")]
    LoadFailure(String),

    #[error("Failed to save network: {0}")]
    SaveFailure(String),

    #[error("Power flow calculation failed: {0}")]
    SolveFailure(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl GridError {
    /// Stable machine-readable kind, used in tool payloads
    pub fn kind(&self) -> &'static str {
        match self {
            GridError::NoNetworkLoaded => "no_network_loaded",
            GridError::UnsupportedFormat(_) => "unsupported_format",
            GridError::FileNotFound(_) => "file_not_found",
            GridError::LoadFailure(_) => "load_failure",
            GridError::SaveFailure(_) => "save_failure",
            GridError::SolveFailure(_) => "solve_failure",
            GridError::InvalidParameter(_) => "invalid_parameter",
        }
    }

    pub fn solve(message: impl Into<String>) -> Self {
        GridError::SolveFailure(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        GridError::InvalidParameter(message.into())
    }
}

pub type GridResult<T> = Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let errors = [
            GridError::NoNetworkLoaded,
            GridError::UnsupportedFormat("x.csv".into()),
            GridError::FileNotFound("x.json".into()),
            GridError::LoadFailure("bad".into()),
            GridError::SaveFailure("bad".into()),
            GridError::solve("singular"),
            GridError::invalid("max_iteration"),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_messages() {
        assert!(GridError::NoNetworkLoaded.to_string().contains("No network"));
        assert_eq!(
            GridError::FileNotFound("grid.json".into()).to_string(),
            "File not found: grid.json"
        );
    }
}
