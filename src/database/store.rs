use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    AuditAction, AuditLog, Evidence, Fee, FeeStatus, Inspection, Organization, Permit,
    PermitStatus, Ticket, TicketStatus, TrafficPlan, UnknownVariant, User,
};

/// Errors surfaced by every `Store` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filter and window for the ticket list
#[derive(Debug, Clone, Default)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Builds the audit entry for a change from the row as it stood before it
pub type AuditFor<'a, T> = &'a (dyn Fn(&T) -> AuditLog + Send + Sync);

/// Computes the replacement permit and its audit entry from the locked current row.
/// Returning an error abandons the change.
pub type PermitChange<'a> = &'a (dyn Fn(&Permit) -> StoreResult<(Permit, AuditLog)> + Send + Sync);

/// Persistence boundary for the permitting domain.
///
/// Every read that takes an `organization_id` only returns rows owned by that
/// organization. Audit entries can be appended and read, never changed.
///
/// Mutations that take an audit entry write the row and the entry together:
/// either both are stored or neither is.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // Organizations
    async fn insert_organization(&self, organization: &Organization) -> StoreResult<()>;
    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;

    // Users
    /// Fails with `Conflict` when the email is already registered
    async fn insert_user(&self, user: &User, audit: Option<&AuditLog>) -> StoreResult<()>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
        audit: &AuditLog,
    ) -> StoreResult<()>;

    // Tickets
    /// Fails with `Conflict` when the ticket number already exists in the organization
    async fn insert_ticket(&self, ticket: &Ticket, audit: Option<&AuditLog>) -> StoreResult<()>;
    async fn get_ticket(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Ticket>>;
    /// Newest first
    async fn list_tickets(&self, organization_id: Uuid, query: &TicketQuery) -> StoreResult<Page<Ticket>>;
    async fn count_tickets(&self, organization_id: Uuid, statuses: &[TicketStatus]) -> StoreResult<u64>;
    /// Change the status while holding the row, so `audit` always sees the status being replaced
    async fn update_ticket_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
        audit: AuditFor<'_, Ticket>,
    ) -> StoreResult<Ticket>;

    // Permits
    async fn insert_permit(&self, permit: &Permit, audit: Option<&AuditLog>) -> StoreResult<()>;
    async fn get_permit(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Permit>>;
    async fn list_permits(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Permit>>;
    /// Read-modify-write of one permit with no other writer in between
    async fn modify_permit(&self, organization_id: Uuid, id: Uuid, change: PermitChange<'_>) -> StoreResult<Permit>;
    async fn count_permits(&self, organization_id: Uuid, status: PermitStatus) -> StoreResult<u64>;

    // Field records
    async fn insert_traffic_plan(&self, plan: &TrafficPlan) -> StoreResult<()>;
    async fn list_traffic_plans(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<TrafficPlan>>;
    async fn insert_inspection(&self, inspection: &Inspection) -> StoreResult<()>;
    async fn list_inspections(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Inspection>>;
    /// Scheduled inspections on or after `from`
    async fn count_upcoming_inspections(&self, organization_id: Uuid, from: DateTime<Utc>) -> StoreResult<u64>;
    async fn insert_evidence(&self, evidence: &Evidence) -> StoreResult<()>;
    async fn list_evidence(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Evidence>>;
    async fn insert_fee(&self, fee: &Fee) -> StoreResult<()>;
    async fn list_fees(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Fee>>;
    async fn count_fees(&self, organization_id: Uuid, status: FeeStatus) -> StoreResult<u64>;

    // Audit trail
    async fn append_audit(&self, entry: &AuditLog) -> StoreResult<()>;
    /// Newest first
    async fn list_audit_for_ticket(&self, organization_id: Uuid, ticket_id: Uuid) -> StoreResult<Vec<AuditLog>>;
    /// Newest first, at most `limit` entries
    async fn list_recent_audit(&self, organization_id: Uuid, limit: u64) -> StoreResult<Vec<AuditLog>>;
    async fn count_audit(&self, organization_id: Uuid) -> StoreResult<u64>;
    /// Sorted by count, highest first
    async fn audit_counts_by_action(&self, organization_id: Uuid) -> StoreResult<Vec<(AuditAction, u64)>>;
    /// Sorted by count, highest first; `None` is the system actor
    async fn audit_counts_by_user(&self, organization_id: Uuid) -> StoreResult<Vec<(Option<Uuid>, u64)>>;
}
