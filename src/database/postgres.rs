use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::models::{
    AuditAction, AuditLog, Evidence, Fee, FeeStatus, Inspection, Organization, Permit,
    PermitStatus, Ticket, TicketStatus, TrafficPlan, User, UtilityType,
};
use super::store::{AuditFor, Page, PermitChange, Store, StoreError, StoreResult, TicketQuery};

/// `Store` backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else passes through
fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Conflict(message())
        }
        _ => StoreError::Database(err),
    }
}

fn decode_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

async fn write_audit(conn: &mut PgConnection, entry: &AuditLog) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO audit_logs (id, ticket_id, organization_id, user_id, action, entity_type, entity_id, \
         previous_data, new_data, timestamp, ip_address, user_agent) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(entry.id)
    .bind(entry.ticket_id)
    .bind(entry.organization_id)
    .bind(entry.user_id)
    .bind(entry.action.as_str())
    .bind(entry.entity_type.as_str())
    .bind(entry.entity_id)
    .bind(&entry.previous_data)
    .bind(&entry.new_data)
    .bind(entry.timestamp)
    .bind(&entry.ip_address)
    .bind(&entry.user_agent)
    .execute(conn)
    .await?;
    Ok(())
}

async fn write_user(conn: &mut PgConnection, user: &User) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO users (id, organization_id, email, password_hash, name, role, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(user.id)
    .bind(user.organization_id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await
    .map_err(|e| conflict_on_unique(e, || "Email already registered".to_string()))?;
    Ok(())
}

async fn write_ticket(conn: &mut PgConnection, ticket: &Ticket) -> StoreResult<()> {
    let utility_types: Vec<&str> = ticket.utility_types.iter().map(|u| u.as_str()).collect();
    sqlx::query(
        "INSERT INTO tickets (id, organization_id, ticket_number, source, status, excavator_name, \
         excavator_phone, excavator_email, work_address, latitude, longitude, utility_types, \
         work_start_date, work_end_date, work_description, emergency_contact, raw_data, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
    )
    .bind(ticket.id)
    .bind(ticket.organization_id)
    .bind(&ticket.ticket_number)
    .bind(&ticket.source)
    .bind(ticket.status.as_str())
    .bind(&ticket.excavator_name)
    .bind(&ticket.excavator_phone)
    .bind(&ticket.excavator_email)
    .bind(&ticket.work_address)
    .bind(ticket.latitude)
    .bind(ticket.longitude)
    .bind(&utility_types)
    .bind(ticket.work_start_date)
    .bind(ticket.work_end_date)
    .bind(&ticket.work_description)
    .bind(&ticket.emergency_contact)
    .bind(&ticket.raw_data)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .execute(conn)
    .await
    .map_err(|e| conflict_on_unique(e, || format!("Ticket {} already exists", ticket.ticket_number)))?;
    Ok(())
}

async fn write_permit(conn: &mut PgConnection, permit: &Permit) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO permits (id, ticket_id, organization_id, permit_number, municipality, permit_type, \
         application_data, prefilled_data, fee, status, submitted_at, approved_at, pdf_path, xml_path, \
         created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(permit.id)
    .bind(permit.ticket_id)
    .bind(permit.organization_id)
    .bind(&permit.permit_number)
    .bind(&permit.municipality)
    .bind(&permit.permit_type)
    .bind(&permit.application_data)
    .bind(&permit.prefilled_data)
    .bind(permit.fee)
    .bind(permit.status.as_str())
    .bind(permit.submitted_at)
    .bind(permit.approved_at)
    .bind(&permit.pdf_path)
    .bind(&permit.xml_path)
    .bind(permit.created_at)
    .bind(permit.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    organization_id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            organization_id: row.organization_id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role: row.role.parse()?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    organization_id: Uuid,
    ticket_number: String,
    source: String,
    status: String,
    excavator_name: String,
    excavator_phone: String,
    excavator_email: Option<String>,
    work_address: String,
    latitude: f64,
    longitude: f64,
    utility_types: Vec<String>,
    work_start_date: DateTime<Utc>,
    work_end_date: DateTime<Utc>,
    work_description: String,
    emergency_contact: Option<String>,
    raw_data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let utility_types = row
            .utility_types
            .iter()
            .map(|u| u.parse::<UtilityType>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Ticket {
            id: row.id,
            organization_id: row.organization_id,
            ticket_number: row.ticket_number,
            source: row.source,
            status: row.status.parse()?,
            excavator_name: row.excavator_name,
            excavator_phone: row.excavator_phone,
            excavator_email: row.excavator_email,
            work_address: row.work_address,
            latitude: row.latitude,
            longitude: row.longitude,
            utility_types,
            work_start_date: row.work_start_date,
            work_end_date: row.work_end_date,
            work_description: row.work_description,
            emergency_contact: row.emergency_contact,
            raw_data: row.raw_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct PermitRow {
    id: Uuid,
    ticket_id: Uuid,
    organization_id: Uuid,
    permit_number: Option<String>,
    municipality: String,
    permit_type: String,
    application_data: Value,
    prefilled_data: Value,
    fee: Decimal,
    status: String,
    submitted_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    pdf_path: Option<String>,
    xml_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PermitRow> for Permit {
    type Error = StoreError;

    fn try_from(row: PermitRow) -> Result<Self, Self::Error> {
        Ok(Permit {
            id: row.id,
            ticket_id: row.ticket_id,
            organization_id: row.organization_id,
            permit_number: row.permit_number,
            municipality: row.municipality,
            permit_type: row.permit_type,
            application_data: row.application_data,
            prefilled_data: row.prefilled_data,
            fee: row.fee,
            status: row.status.parse()?,
            submitted_at: row.submitted_at,
            approved_at: row.approved_at,
            pdf_path: row.pdf_path,
            xml_path: row.xml_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct InspectionRow {
    id: Uuid,
    ticket_id: Uuid,
    permit_id: Option<Uuid>,
    organization_id: Uuid,
    inspection_type: String,
    scheduled_date: DateTime<Utc>,
    scheduled_time: String,
    inspector: String,
    inspector_contact: String,
    status: String,
    notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    calendar_event_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InspectionRow> for Inspection {
    type Error = StoreError;

    fn try_from(row: InspectionRow) -> Result<Self, Self::Error> {
        Ok(Inspection {
            id: row.id,
            ticket_id: row.ticket_id,
            permit_id: row.permit_id,
            organization_id: row.organization_id,
            inspection_type: row.inspection_type,
            scheduled_date: row.scheduled_date,
            scheduled_time: row.scheduled_time,
            inspector: row.inspector,
            inspector_contact: row.inspector_contact,
            status: row.status.parse()?,
            notes: row.notes,
            completed_at: row.completed_at,
            calendar_event_id: row.calendar_event_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct EvidenceRow {
    id: Uuid,
    ticket_id: Uuid,
    organization_id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    evidence_type: String,
    title: String,
    description: Option<String>,
    file_path: String,
    file_type: String,
    file_size: i64,
    gps_latitude: Option<f64>,
    gps_longitude: Option<f64>,
    captured_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EvidenceRow> for Evidence {
    type Error = StoreError;

    fn try_from(row: EvidenceRow) -> Result<Self, Self::Error> {
        Ok(Evidence {
            id: row.id,
            ticket_id: row.ticket_id,
            organization_id: row.organization_id,
            user_id: row.user_id,
            evidence_type: row.evidence_type.parse()?,
            title: row.title,
            description: row.description,
            file_path: row.file_path,
            file_type: row.file_type,
            file_size: row.file_size,
            gps_latitude: row.gps_latitude,
            gps_longitude: row.gps_longitude,
            captured_at: row.captured_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct FeeRow {
    id: Uuid,
    ticket_id: Uuid,
    organization_id: Uuid,
    #[sqlx(rename = "type")]
    fee_type: String,
    description: String,
    amount: Decimal,
    due_date: DateTime<Utc>,
    paid_date: Option<DateTime<Utc>>,
    paid_amount: Option<Decimal>,
    status: String,
    reference_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FeeRow> for Fee {
    type Error = StoreError;

    fn try_from(row: FeeRow) -> Result<Self, Self::Error> {
        Ok(Fee {
            id: row.id,
            ticket_id: row.ticket_id,
            organization_id: row.organization_id,
            fee_type: row.fee_type,
            description: row.description,
            amount: row.amount,
            due_date: row.due_date,
            paid_date: row.paid_date,
            paid_amount: row.paid_amount,
            status: row.status.parse()?,
            reference_number: row.reference_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: Uuid,
    ticket_id: Option<Uuid>,
    organization_id: Uuid,
    user_id: Option<Uuid>,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    previous_data: Option<Value>,
    new_data: Value,
    timestamp: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl TryFrom<AuditRow> for AuditLog {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id: row.id,
            ticket_id: row.ticket_id,
            organization_id: row.organization_id,
            user_id: row.user_id,
            action: row.action.parse()?,
            entity_type: row.entity_type.parse()?,
            entity_id: row.entity_id,
            previous_data: row.previous_data,
            new_data: row.new_data,
            timestamp: row.timestamp,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_organization(&self, organization: &Organization) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO organizations (id, name, code, address, contact_email, contact_phone, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(organization.id)
        .bind(&organization.name)
        .bind(&organization.code)
        .bind(&organization.address)
        .bind(&organization.contact_email)
        .bind(&organization.contact_phone)
        .bind(organization.created_at)
        .bind(organization.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_unique(e, || format!("Organization code '{}' already exists", organization.code))
        })?;
        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(organization)
    }

    async fn insert_user(&self, user: &User, audit: Option<&AuditLog>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        write_user(&mut tx, user).await?;
        if let Some(entry) = audit {
            write_audit(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn update_user_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
        audit: &AuditLog,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        write_audit(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_ticket(&self, ticket: &Ticket, audit: Option<&AuditLog>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        write_ticket(&mut tx, ticket).await?;
        if let Some(entry) = audit {
            write_audit(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_ticket(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Ticket>> {
        sqlx::query_as::<_, TicketRow>("SELECT * FROM tickets WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    async fn list_tickets(&self, organization_id: Uuid, query: &TicketQuery) -> StoreResult<Page<Ticket>> {
        let status = query.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT * FROM tickets WHERE organization_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC, seq DESC LIMIT $3 OFFSET $4",
        )
        .bind(organization_id)
        .bind(status)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE organization_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(organization_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page {
            items: decode_all(rows)?,
            total: total as u64,
        })
    }

    async fn count_tickets(&self, organization_id: Uuid, statuses: &[TicketStatus]) -> StoreResult<u64> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE organization_id = $1 AND status = ANY($2)",
        )
        .bind(organization_id)
        .bind(&statuses)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn update_ticket_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
        audit: AuditFor<'_, Ticket>,
    ) -> StoreResult<Ticket> {
        let mut tx = self.pool.begin().await?;
        let previous = sqlx::query_as::<_, TicketRow>(
            "SELECT * FROM tickets WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Ticket"))?;
        let entry = audit(&Ticket::try_from(previous)?);

        let row = sqlx::query_as::<_, TicketRow>(
            "UPDATE tickets SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(updated_at)
        .fetch_one(&mut *tx)
        .await?;
        write_audit(&mut tx, &entry).await?;
        tx.commit().await?;
        Ticket::try_from(row)
    }

    async fn insert_permit(&self, permit: &Permit, audit: Option<&AuditLog>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        write_permit(&mut tx, permit).await?;
        if let Some(entry) = audit {
            write_audit(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_permit(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Permit>> {
        sqlx::query_as::<_, PermitRow>("SELECT * FROM permits WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Permit::try_from)
            .transpose()
    }

    async fn list_permits(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Permit>> {
        let rows = sqlx::query_as::<_, PermitRow>(
            "SELECT * FROM permits WHERE organization_id = $1 AND ($2::uuid IS NULL OR ticket_id = $2) \
             ORDER BY created_at DESC, seq DESC",
        )
        .bind(organization_id)
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn modify_permit(&self, organization_id: Uuid, id: Uuid, change: PermitChange<'_>) -> StoreResult<Permit> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, PermitRow>(
            "SELECT * FROM permits WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound("Permit"))?;
        let (permit, entry) = change(&Permit::try_from(current)?)?;

        sqlx::query(
            "UPDATE permits SET permit_number = $2, application_data = $3, prefilled_data = $4, fee = $5, \
             status = $6, submitted_at = $7, approved_at = $8, pdf_path = $9, xml_path = $10, updated_at = $11 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&permit.permit_number)
        .bind(&permit.application_data)
        .bind(&permit.prefilled_data)
        .bind(permit.fee)
        .bind(permit.status.as_str())
        .bind(permit.submitted_at)
        .bind(permit.approved_at)
        .bind(&permit.pdf_path)
        .bind(&permit.xml_path)
        .bind(permit.updated_at)
        .execute(&mut *tx)
        .await?;
        write_audit(&mut tx, &entry).await?;
        tx.commit().await?;
        Ok(permit)
    }

    async fn count_permits(&self, organization_id: Uuid, status: PermitStatus) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM permits WHERE organization_id = $1 AND status = $2")
                .bind(organization_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn insert_traffic_plan(&self, plan: &TrafficPlan) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO traffic_plans (id, ticket_id, organization_id, template_id, template_name, \
             generated_data, pdf_path, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(plan.id)
        .bind(plan.ticket_id)
        .bind(plan.organization_id)
        .bind(&plan.template_id)
        .bind(&plan.template_name)
        .bind(&plan.generated_data)
        .bind(&plan.pdf_path)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_traffic_plans(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<TrafficPlan>> {
        let plans = sqlx::query_as::<_, TrafficPlan>(
            "SELECT * FROM traffic_plans WHERE organization_id = $1 AND ($2::uuid IS NULL OR ticket_id = $2) \
             ORDER BY created_at DESC, seq DESC",
        )
        .bind(organization_id)
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn insert_inspection(&self, inspection: &Inspection) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO inspections (id, ticket_id, permit_id, organization_id, inspection_type, scheduled_date, \
             scheduled_time, inspector, inspector_contact, status, notes, completed_at, calendar_event_id, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(inspection.id)
        .bind(inspection.ticket_id)
        .bind(inspection.permit_id)
        .bind(inspection.organization_id)
        .bind(&inspection.inspection_type)
        .bind(inspection.scheduled_date)
        .bind(&inspection.scheduled_time)
        .bind(&inspection.inspector)
        .bind(&inspection.inspector_contact)
        .bind(inspection.status.as_str())
        .bind(&inspection.notes)
        .bind(inspection.completed_at)
        .bind(&inspection.calendar_event_id)
        .bind(inspection.created_at)
        .bind(inspection.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_inspections(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Inspection>> {
        let rows = sqlx::query_as::<_, InspectionRow>(
            "SELECT * FROM inspections WHERE organization_id = $1 AND ($2::uuid IS NULL OR ticket_id = $2) \
             ORDER BY created_at DESC, seq DESC",
        )
        .bind(organization_id)
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn count_upcoming_inspections(&self, organization_id: Uuid, from: DateTime<Utc>) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inspections \
             WHERE organization_id = $1 AND status = 'SCHEDULED' AND scheduled_date >= $2",
        )
        .bind(organization_id)
        .bind(from)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn insert_evidence(&self, evidence: &Evidence) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO evidence (id, ticket_id, organization_id, user_id, type, title, description, file_path, \
             file_type, file_size, gps_latitude, gps_longitude, captured_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(evidence.id)
        .bind(evidence.ticket_id)
        .bind(evidence.organization_id)
        .bind(evidence.user_id)
        .bind(evidence.evidence_type.as_str())
        .bind(&evidence.title)
        .bind(&evidence.description)
        .bind(&evidence.file_path)
        .bind(&evidence.file_type)
        .bind(evidence.file_size)
        .bind(evidence.gps_latitude)
        .bind(evidence.gps_longitude)
        .bind(evidence.captured_at)
        .bind(evidence.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_evidence(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Evidence>> {
        let rows = sqlx::query_as::<_, EvidenceRow>(
            "SELECT * FROM evidence WHERE organization_id = $1 AND ($2::uuid IS NULL OR ticket_id = $2) \
             ORDER BY created_at DESC, seq DESC",
        )
        .bind(organization_id)
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn insert_fee(&self, fee: &Fee) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO fees (id, ticket_id, organization_id, type, description, amount, due_date, paid_date, \
             paid_amount, status, reference_number, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(fee.id)
        .bind(fee.ticket_id)
        .bind(fee.organization_id)
        .bind(&fee.fee_type)
        .bind(&fee.description)
        .bind(fee.amount)
        .bind(fee.due_date)
        .bind(fee.paid_date)
        .bind(fee.paid_amount)
        .bind(fee.status.as_str())
        .bind(&fee.reference_number)
        .bind(fee.created_at)
        .bind(fee.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_fees(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Fee>> {
        let rows = sqlx::query_as::<_, FeeRow>(
            "SELECT * FROM fees WHERE organization_id = $1 AND ($2::uuid IS NULL OR ticket_id = $2) \
             ORDER BY created_at DESC, seq DESC",
        )
        .bind(organization_id)
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn count_fees(&self, organization_id: Uuid, status: FeeStatus) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM fees WHERE organization_id = $1 AND status = $2")
                .bind(organization_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn append_audit(&self, entry: &AuditLog) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        write_audit(&mut conn, entry).await
    }

    async fn list_audit_for_ticket(&self, organization_id: Uuid, ticket_id: Uuid) -> StoreResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_logs WHERE organization_id = $1 AND ticket_id = $2 ORDER BY timestamp DESC, seq DESC",
        )
        .bind(organization_id)
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn list_recent_audit(&self, organization_id: Uuid, limit: u64) -> StoreResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT * FROM audit_logs WHERE organization_id = $1 ORDER BY timestamp DESC, seq DESC LIMIT $2",
        )
        .bind(organization_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        decode_all(rows)
    }

    async fn count_audit(&self, organization_id: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn audit_counts_by_action(&self, organization_id: Uuid) -> StoreResult<Vec<(AuditAction, u64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT action, COUNT(*) FROM audit_logs WHERE organization_id = $1 \
             GROUP BY action ORDER BY COUNT(*) DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(action, count)| -> StoreResult<(AuditAction, u64)> {
                Ok((action.parse()?, count as u64))
            })
            .collect()
    }

    async fn audit_counts_by_user(&self, organization_id: Uuid) -> StoreResult<Vec<(Option<Uuid>, u64)>> {
        let rows: Vec<(Option<Uuid>, i64)> = sqlx::query_as(
            "SELECT user_id, COUNT(*) FROM audit_logs WHERE organization_id = $1 \
             GROUP BY user_id ORDER BY COUNT(*) DESC",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(user, count)| (user, count as u64)).collect())
    }
}
