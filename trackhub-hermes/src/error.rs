//! Errors raised while delivering a hub.
//!
//! The core never raises these; they describe failures of the staging and
//! upload steps around it.

use thiserror::Error;
use trackhub_libs::HubError;

#[derive(Error, Debug)]
pub enum StageError {
    /// Staging failed, e.g. a referenced data file is missing
    ///
    /// # Example
    /// ```ignore
    /// let error = StageError::Staging("data file /data/a.bw does not exist".to_string());
    /// ```
    #[error("Staging error: {0}")]
    Staging(String),

    /// The transfer failed, exited non-zero or timed out
    #[error("Upload error: {0}")]
    Upload(String),

    /// A hub definition was rejected by the registry
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from building, validating or rendering the hub
    #[error(transparent)]
    Hub(#[from] HubError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = StageError::Staging("missing".to_string());
        assert_eq!(error.to_string(), "Staging error: missing");

        let error = StageError::Upload("rsync exited with 23".to_string());
        assert_eq!(error.to_string(), "Upload error: rsync exited with 23");
    }

    #[test]
    fn test_hub_errors_pass_through() {
        let error: StageError = HubError::Structure("cycle".to_string()).into();
        assert_eq!(error.to_string(), "Structure error: cycle");
    }
}
