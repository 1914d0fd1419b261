use thiserror::Error;

/// A submission that cannot be turned into a job card.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Missing required field: {0}")]
    Missing(&'static str),

    #[error("Field '{field}' is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("Unknown item kind: {0}")]
    InvalidItem(String),

    #[error("Uploaded file '{file_name}' is not a supported image")]
    NotAnImage { file_name: String },

    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}
