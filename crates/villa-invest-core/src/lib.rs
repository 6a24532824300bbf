pub mod error;
pub mod financing;
pub mod project;
pub mod time_value;
pub mod types;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::VillaInvestError;
pub use types::*;

/// Standard result type for all villa-invest operations
pub type VillaInvestResult<T> = Result<T, VillaInvestError>;
