use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("missing required field(s): {}", .fields.join(", "))]
    MissingRequiredField { fields: Vec<&'static str> },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}
