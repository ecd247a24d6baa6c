pub mod audit_service;
pub mod dashboard_service;
pub mod permit_service;
pub mod ticket_service;

pub use audit_service::{Actor, AuditEntry, AuditService};
pub use dashboard_service::DashboardService;
pub use permit_service::PermitService;
pub use ticket_service::{Raw811Notice, TicketService};

use crate::database::StoreError;

/// Failures of domain operations, independent of transport
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => ServiceError::NotFound(entity),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
