use crate::domain::notice::Notice;
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failures reported by a gateway adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Transport(String),
    #[error("Gateway rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("Payment {0} not found at gateway")]
    NotFound(String),
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),
    #[error("Gateway storage error: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Gateway error: {0}")]
    GatewayError(#[from] GatewayError),
    #[error(
        "Payment {payment_id} status unknown after {attempts} attempts (last observed: {})",
        last_status(.last_record)
    )]
    PollTimeout {
        payment_id: String,
        attempts: u32,
        last_record: Option<Box<PaymentRecord>>,
    },
    #[error("Payment polling cancelled")]
    Cancelled,
    #[error("Payment {payment_id} status moved backwards from {from} to {to}")]
    StatusRegression {
        payment_id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn last_status(record: &Option<Box<PaymentRecord>>) -> String {
    record
        .as_ref()
        .map(|r| r.status.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl PaymentError {
    /// The user-facing treatment for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            PaymentError::ValidationError(_) | PaymentError::GatewayError(_) => {
                Notice::RetryPrompt
            }
            PaymentError::PollTimeout { .. } => Notice::CheckOrderHistory,
            PaymentError::Cancelled => Notice::Silent,
            PaymentError::StatusRegression { .. }
            | PaymentError::CsvError(_)
            | PaymentError::IoError(_)
            | PaymentError::InternalError(_) => Notice::ContactSupport,
        }
    }

    /// Short machine-readable label, used in CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::ValidationError(_) => "validation_error",
            PaymentError::GatewayError(_) => "gateway_error",
            PaymentError::PollTimeout { .. } => "timeout",
            PaymentError::Cancelled => "cancelled",
            PaymentError::StatusRegression { .. } => "data_error",
            PaymentError::CsvError(_)
            | PaymentError::IoError(_)
            | PaymentError::InternalError(_) => "internal_error",
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(e))
    }
}
