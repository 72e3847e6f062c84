pub mod lock_service;
pub mod record_service;
pub mod settlement_service;

pub use lock_service::MonthLockService;
pub use record_service::{PurchaseUpdate, RecordService};
pub use settlement_service::{SettlementInputs, SettlementOptions, SettlementService};

use uuid::Uuid;

use crate::core::validation::ValidationIssue;
use crate::domain::MonthKey;
use crate::errors::LedgerError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Month {month} is locked for unit {unit}")]
    MonthLocked { unit: Uuid, month: MonthKey },
}

impl From<ValidationIssue> for ServiceError {
    fn from(issue: ValidationIssue) -> Self {
        ServiceError::Validation(issue.to_string())
    }
}
