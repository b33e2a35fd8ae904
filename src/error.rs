use thiserror::Error;

/// Error taxonomy for the reporting engine.
///
/// `NotFound` and `InvalidInput` are "no result" outcomes at the boundary;
/// `DataAccess` and `Publish` are genuine failures and must never be folded
/// into the empty-data sentinels.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("data access failed during {stage}: {source}")]
    DataAccess {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("emergency publish failed: {0}")]
    Publish(String),
}

impl ReportError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ReportError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ReportError::NotFound(msg.into())
    }

    /// True for the outcomes the boundary reports as "no result" rather
    /// than a server failure.
    pub fn is_no_result(&self) -> bool {
        matches!(
            self,
            ReportError::InvalidInput(_) | ReportError::NotFound(_)
        )
    }
}

impl From<sqlx::Error> for ReportError {
    fn from(source: sqlx::Error) -> Self {
        ReportError::DataAccess {
            stage: "fetch",
            source,
        }
    }
}
