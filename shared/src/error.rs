use thiserror::Error;

/// Why an inbound frame could not be turned into a [`crate::ServerMessage`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no string `type` field")]
    MissingType,

    #[error("`{kind}` message is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("`{kind}` message has an unexpected shape: {source}")]
    Shape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
