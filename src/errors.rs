use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DebtError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("debt not found: {id}")]
    DebtNotFound {
        id: Uuid,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: Uuid,
    },

    #[error("concurrent update on debt {debt_id} after {attempts} attempt(s)")]
    ConcurrencyConflict {
        debt_id: Uuid,
        attempts: u32,
    },

    #[error("arithmetic invariant violated: {message}")]
    ArithmeticInvariant {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error(transparent)]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl DebtError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DebtError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        DebtError::ArithmeticInvariant {
            message: message.into(),
        }
    }

    /// true for errors a caller may retry as-is. Payment writes never return
    /// one once the payment itself has been stored.
    pub fn is_transient(&self) -> bool {
        matches!(self, DebtError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, DebtError>;
