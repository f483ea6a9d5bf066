use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WagerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Insufficient funds: balance {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },
    #[error("A session is already active for this game")]
    SessionAlreadyActive,
    #[error("No active session for this game")]
    NoActiveSession,
    #[error("Nothing to cash out")]
    NothingToCashOut,
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl WagerError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    /// Guard violations and bad input leave no state behind and can be retried
    /// by the caller. Storage and configuration failures cannot.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InsufficientFunds { .. }
                | Self::SessionAlreadyActive
                | Self::NoActiveSession
                | Self::NothingToCashOut
                | Self::InvalidMove(_)
        )
    }
}

impl From<std::io::Error> for WagerError {
    fn from(err: std::io::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for WagerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, WagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_guard_violations_are_recoverable() {
        assert!(WagerError::NoActiveSession.is_recoverable());
        assert!(
            WagerError::InsufficientFunds {
                available: dec!(1),
                required: dec!(2),
            }
            .is_recoverable()
        );
        assert!(!WagerError::internal("disk gone").is_recoverable());
    }
}
