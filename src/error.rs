use crate::schema::CanonicalEntity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinancialRatioError {
    #[error("Unknown canonical entity: '{0}'")]
    UnknownEntity(String),

    #[error("Sheet is locked. Unlock it to allow edits or extraction overwrite.")]
    SheetLocked,

    #[error("{0} is a protected entity and is always derived by formula")]
    ProtectedEntity(CanonicalEntity),

    #[error("Invalid tax rate {0}: must be a finite value between 0.0 and 1.0")]
    InvalidTaxRate(f64),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FinancialRatioError>;
