use betascope_core::{BetaError, CoreError, ErrorClass, HttpError};
use betascope_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] betascope_core::ValidationError),

    #[error("{}", describe(.0))]
    Beta(#[from] BetaError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("http client setup failed: {0}")]
    Http(#[from] HttpError),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe(error: &BetaError) -> String {
    match error.field() {
        Some(field) => format!("{field}: {}", error.public_message()),
        None => error.public_message(),
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Beta(error) => match error.class() {
                ErrorClass::Validation => 2,
                ErrorClass::UpstreamUnavailable | ErrorClass::InsufficientData => 3,
                ErrorClass::Internal => 10,
            },
            Self::Core(CoreError::Validation(_) | CoreError::Config(_)) => 2,
            Self::Core(CoreError::Serialization(_)) | Self::Serialization(_) => 4,
            Self::Core(_) | Self::Http(_) | Self::Warehouse(_) | Self::Io(_) => 10,
        }
    }
}
