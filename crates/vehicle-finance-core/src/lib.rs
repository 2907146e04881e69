pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "amortization")]
pub mod amortization;

#[cfg(feature = "records")]
pub mod records;

pub use error::VehicleFinanceError;
pub use types::*;

/// Standard result type for all vehicle-finance operations
pub type VehicleFinanceResult<T> = Result<T, VehicleFinanceError>;
