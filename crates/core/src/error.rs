use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid evaluation context: {0}")]
    InvalidContext(String),
}
