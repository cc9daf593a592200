use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid reference data: {0}")]
    InvalidReferenceData(String),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),
}
