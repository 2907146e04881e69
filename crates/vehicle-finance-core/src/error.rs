use thiserror::Error;

#[derive(Debug, Error)]
pub enum VehicleFinanceError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Installment index {index} out of range for a schedule of {len} installments")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Loan record not found: {0}")]
    NotFound(String),

    #[error("A loan record for {0} already exists")]
    DuplicateEmail(String),

    #[error("Version conflict on record {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for VehicleFinanceError {
    fn from(e: serde_json::Error) -> Self {
        VehicleFinanceError::SerializationError(e.to_string())
    }
}
