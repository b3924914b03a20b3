//! Configuration Errors
//!
//! Everything that can go wrong before a single command is built. These are
//! fatal to the construction step that raised them and are never defaulted
//! away; result-parsing failures live in [`crate::outcome`] instead.

use crate::outcome::ReturnCode;
use thiserror::Error;

/// Errors detected while validating a benchmark configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The benchmark definition did not name its executable
    #[error("Benchmark binary name is not set for '{benchmark}'")]
    BinaryNameNotSet { benchmark: String },

    #[error("Unknown stopping criterion '{0}', expected 'stdrel' or 'entropy'")]
    UnknownStoppingCriterion(String),

    #[error("Invalid device selector '{0}', expected an index, a comma-separated index list or 'all'")]
    InvalidDeviceSelector(String),

    #[error(
        "IB_DEVICES contains mixed numeric indices and device names: {0}. \
         All values must be either numeric indices (e.g., \"0,2,4,6\") \
         or device names (e.g., \"mlx5_ib0,mlx5_ib2\")."
    )]
    MixedDeviceList(String),

    #[error("Empty entry in device list '{0}'")]
    EmptyDeviceEntry(String),

    #[error("Unsupported data type '{ty}', supported: {}", supported.join(" "))]
    UnsupportedDataType { ty: String, supported: Vec<String> },

    #[error("Axis '{0}' has no values")]
    EmptyAxis(String),

    #[error("Invalid range '{value}': {reason}")]
    InvalidRange { value: String, reason: String },

    #[error("Sweep expands to more than {limit} combinations")]
    SweepTooLarge { limit: usize },

    #[error("Invalid shape '{0}', expected 'm,n,k'")]
    InvalidShape(String),

    #[error("Invalid value for '{option}': {reason}")]
    InvalidValue { option: String, reason: String },
}

impl ConfigError {
    /// Return code reported when this error aborts a benchmark.
    ///
    /// A missing binary name is a programmer error and keeps its own code so it
    /// is never confused with bad user input.
    pub fn code(&self) -> ReturnCode {
        match self {
            ConfigError::BinaryNameNotSet { .. } => ReturnCode::MicrobenchmarkBinaryNameNotSet,
            ConfigError::UnsupportedDataType { .. } => {
                ReturnCode::MicrobenchmarkUnsupportedDataType
            }
            _ => ReturnCode::InvalidArgument,
        }
    }
}
