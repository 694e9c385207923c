use reqwest::StatusCode;
use thiserror::Error;

/// Failure categories a caller may want to branch on.
///
/// These travel inside `anyhow::Error`; recover them with
/// `err.downcast_ref::<ExtractError>()`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("BRUIN_START_DATE and BRUIN_END_DATE must be provided")]
    MissingDateBounds,

    #[error("cannot parse date `{value}`")]
    InvalidDate { value: String },

    #[error("invalid pipeline variables: {0}")]
    InvalidVars(#[from] serde_json::Error),

    #[error("GET {url} returned {status}")]
    HttpStatus { url: String, status: StatusCode },
}
