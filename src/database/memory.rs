use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    AuditAction, AuditLog, Evidence, Fee, FeeStatus, Inspection, InspectionStatus, Organization,
    Permit, PermitStatus, Ticket, TicketStatus, TrafficPlan, User,
};
use super::store::{AuditFor, Page, PermitChange, Store, StoreError, StoreResult, TicketQuery};

#[derive(Default)]
struct Tables {
    organizations: Vec<Organization>,
    users: Vec<User>,
    tickets: Vec<Ticket>,
    permits: Vec<Permit>,
    traffic_plans: Vec<TrafficPlan>,
    inspections: Vec<Inspection>,
    evidence: Vec<Evidence>,
    fees: Vec<Fee>,
    audit_logs: Vec<AuditLog>,
}

/// Process-local store backing development without Postgres and the test suite
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rows for one organization, optionally narrowed to a ticket, newest first
fn scoped<T: Clone>(
    rows: &[T],
    organization_id: Uuid,
    ticket_id: Option<Uuid>,
    key: impl Fn(&T) -> (Uuid, Uuid, DateTime<Utc>),
) -> Vec<T> {
    let mut matched: Vec<(DateTime<Utc>, T)> = rows
        .iter()
        .filter_map(|row| {
            let (org, ticket, created_at) = key(row);
            let wanted = org == organization_id && ticket_id.map_or(true, |t| t == ticket);
            wanted.then(|| (created_at, row.clone()))
        })
        .collect();
    matched.sort_by_key(|(created_at, _)| *created_at);
    matched.reverse();
    matched.into_iter().map(|(_, row)| row).collect()
}

fn tally<K: Eq + Hash + Copy>(keys: impl Iterator<Item = K>) -> Vec<(K, u64)> {
    let mut counts: HashMap<K, u64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut counts: Vec<(K, u64)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_organization(&self, organization: &Organization) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.organizations.iter().any(|o| o.code == organization.code) {
            return Err(StoreError::Conflict(format!(
                "Organization code '{}' already exists",
                organization.code
            )));
        }
        tables.organizations.push(organization.clone());
        Ok(())
    }

    async fn get_organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.iter().find(|o| o.id == id).cloned())
    }

    async fn insert_user(&self, user: &User, audit: Option<&AuditLog>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        tables.users.push(user.clone());
        tables.audit_logs.extend(audit.cloned());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user_password(
        &self,
        id: Uuid,
        password_hash: &str,
        updated_at: DateTime<Utc>,
        audit: &AuditLog,
    ) -> StoreResult<()> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound("User"))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = updated_at;
        tables.audit_logs.push(audit.clone());
        Ok(())
    }

    async fn insert_ticket(&self, ticket: &Ticket, audit: Option<&AuditLog>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.tickets.iter().any(|t| {
            t.organization_id == ticket.organization_id && t.ticket_number == ticket.ticket_number
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "Ticket {} already exists",
                ticket.ticket_number
            )));
        }
        tables.tickets.push(ticket.clone());
        tables.audit_logs.extend(audit.cloned());
        Ok(())
    }

    async fn get_ticket(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .iter()
            .find(|t| t.id == id && t.organization_id == organization_id)
            .cloned())
    }

    async fn list_tickets(&self, organization_id: Uuid, query: &TicketQuery) -> StoreResult<Page<Ticket>> {
        let tables = self.tables.read().await;
        let matching: Vec<Ticket> = scoped(&tables.tickets, organization_id, None, |t| {
            (t.organization_id, t.id, t.created_at)
        })
        .into_iter()
        .filter(|t| query.status.map_or(true, |s| t.status == s))
        .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn count_tickets(&self, organization_id: Uuid, statuses: &[TicketStatus]) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .iter()
            .filter(|t| t.organization_id == organization_id && statuses.contains(&t.status))
            .count() as u64)
    }

    async fn update_ticket_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
        audit: AuditFor<'_, Ticket>,
    ) -> StoreResult<Ticket> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let ticket = tables
            .tickets
            .iter_mut()
            .find(|t| t.id == id && t.organization_id == organization_id)
            .ok_or(StoreError::NotFound("Ticket"))?;
        let entry = audit(ticket);
        ticket.status = status;
        ticket.updated_at = updated_at;
        let updated = ticket.clone();
        tables.audit_logs.push(entry);
        Ok(updated)
    }

    async fn insert_permit(&self, permit: &Permit, audit: Option<&AuditLog>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.permits.push(permit.clone());
        tables.audit_logs.extend(audit.cloned());
        Ok(())
    }

    async fn get_permit(&self, organization_id: Uuid, id: Uuid) -> StoreResult<Option<Permit>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permits
            .iter()
            .find(|p| p.id == id && p.organization_id == organization_id)
            .cloned())
    }

    async fn list_permits(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Permit>> {
        let tables = self.tables.read().await;
        Ok(scoped(&tables.permits, organization_id, ticket_id, |p| {
            (p.organization_id, p.ticket_id, p.created_at)
        }))
    }

    async fn modify_permit(&self, organization_id: Uuid, id: Uuid, change: PermitChange<'_>) -> StoreResult<Permit> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let existing = tables
            .permits
            .iter_mut()
            .find(|p| p.id == id && p.organization_id == organization_id)
            .ok_or(StoreError::NotFound("Permit"))?;
        let (permit, entry) = change(existing)?;
        *existing = permit.clone();
        tables.audit_logs.push(entry);
        Ok(permit)
    }

    async fn count_permits(&self, organization_id: Uuid, status: PermitStatus) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .permits
            .iter()
            .filter(|p| p.organization_id == organization_id && p.status == status)
            .count() as u64)
    }

    async fn insert_traffic_plan(&self, plan: &TrafficPlan) -> StoreResult<()> {
        self.tables.write().await.traffic_plans.push(plan.clone());
        Ok(())
    }

    async fn list_traffic_plans(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<TrafficPlan>> {
        let tables = self.tables.read().await;
        Ok(scoped(&tables.traffic_plans, organization_id, ticket_id, |p| {
            (p.organization_id, p.ticket_id, p.created_at)
        }))
    }

    async fn insert_inspection(&self, inspection: &Inspection) -> StoreResult<()> {
        self.tables.write().await.inspections.push(inspection.clone());
        Ok(())
    }

    async fn list_inspections(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Inspection>> {
        let tables = self.tables.read().await;
        Ok(scoped(&tables.inspections, organization_id, ticket_id, |i| {
            (i.organization_id, i.ticket_id, i.created_at)
        }))
    }

    async fn count_upcoming_inspections(&self, organization_id: Uuid, from: DateTime<Utc>) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .inspections
            .iter()
            .filter(|i| {
                i.organization_id == organization_id
                    && i.status == InspectionStatus::Scheduled
                    && i.scheduled_date >= from
            })
            .count() as u64)
    }

    async fn insert_evidence(&self, evidence: &Evidence) -> StoreResult<()> {
        self.tables.write().await.evidence.push(evidence.clone());
        Ok(())
    }

    async fn list_evidence(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Evidence>> {
        let tables = self.tables.read().await;
        Ok(scoped(&tables.evidence, organization_id, ticket_id, |e| {
            (e.organization_id, e.ticket_id, e.created_at)
        }))
    }

    async fn insert_fee(&self, fee: &Fee) -> StoreResult<()> {
        self.tables.write().await.fees.push(fee.clone());
        Ok(())
    }

    async fn list_fees(&self, organization_id: Uuid, ticket_id: Option<Uuid>) -> StoreResult<Vec<Fee>> {
        let tables = self.tables.read().await;
        Ok(scoped(&tables.fees, organization_id, ticket_id, |f| {
            (f.organization_id, f.ticket_id, f.created_at)
        }))
    }

    async fn count_fees(&self, organization_id: Uuid, status: FeeStatus) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .fees
            .iter()
            .filter(|f| f.organization_id == organization_id && f.status == status)
            .count() as u64)
    }

    async fn append_audit(&self, entry: &AuditLog) -> StoreResult<()> {
        self.tables.write().await.audit_logs.push(entry.clone());
        Ok(())
    }

    async fn list_audit_for_ticket(&self, organization_id: Uuid, ticket_id: Uuid) -> StoreResult<Vec<AuditLog>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<AuditLog> = tables
            .audit_logs
            .iter()
            .filter(|a| a.organization_id == organization_id && a.ticket_id == Some(ticket_id))
            .cloned()
            .collect();
        // Stable sort keeps append order among equal timestamps; reverse for newest first
        entries.sort_by_key(|a| a.timestamp);
        entries.reverse();
        Ok(entries)
    }

    async fn list_recent_audit(&self, organization_id: Uuid, limit: u64) -> StoreResult<Vec<AuditLog>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<AuditLog> = tables
            .audit_logs
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .cloned()
            .collect();
        entries.sort_by_key(|a| a.timestamp);
        entries.reverse();
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn count_audit(&self, organization_id: Uuid) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit_logs
            .iter()
            .filter(|a| a.organization_id == organization_id)
            .count() as u64)
    }

    async fn audit_counts_by_action(&self, organization_id: Uuid) -> StoreResult<Vec<(AuditAction, u64)>> {
        let tables = self.tables.read().await;
        Ok(tally(
            tables
                .audit_logs
                .iter()
                .filter(|a| a.organization_id == organization_id)
                .map(|a| a.action),
        ))
    }

    async fn audit_counts_by_user(&self, organization_id: Uuid) -> StoreResult<Vec<(Option<Uuid>, u64)>> {
        let tables = self.tables.read().await;
        Ok(tally(
            tables
                .audit_logs
                .iter()
                .filter(|a| a.organization_id == organization_id)
                .map(|a| a.user_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{AuditAction, EntityType, UtilityType};
    use chrono::Duration;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn ticket(organization_id: Uuid, number: &str, status: TicketStatus, age_minutes: i64) -> Ticket {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        Ticket {
            id: Uuid::new_v4(),
            organization_id,
            ticket_number: number.to_string(),
            source: "TX811".to_string(),
            status,
            excavator_name: "Acme".to_string(),
            excavator_phone: "(512) 555-0000".to_string(),
            excavator_email: None,
            work_address: "1 Main St, Austin, TX 78701".to_string(),
            latitude: 30.2672,
            longitude: -97.7431,
            utility_types: vec![UtilityType::Water],
            work_start_date: created_at,
            work_end_date: created_at + Duration::days(2),
            work_description: "Water main repair".to_string(),
            emergency_contact: None,
            raw_data: serde_json::json!({}),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn ticket_numbers_are_unique_per_organization() {
        let store = MemoryStore::new();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();

        store.insert_ticket(&ticket(org_a, "TX-1", TicketStatus::Intake, 0), None).await.unwrap();
        store.insert_ticket(&ticket(org_b, "TX-1", TicketStatus::Intake, 0), None).await.unwrap();
        let err = store
            .insert_ticket(&ticket(org_a, "TX-1", TicketStatus::Intake, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_tickets_filters_pages_and_orders_newest_first() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        store.insert_ticket(&ticket(org, "old", TicketStatus::Intake, 30), None).await.unwrap();
        store.insert_ticket(&ticket(org, "mid", TicketStatus::Closed, 20), None).await.unwrap();
        store.insert_ticket(&ticket(org, "new", TicketStatus::Intake, 10), None).await.unwrap();
        store
            .insert_ticket(&ticket(Uuid::new_v4(), "foreign", TicketStatus::Intake, 0), None)
            .await
            .unwrap();

        let page = store
            .list_tickets(org, &TicketQuery { status: None, offset: 0, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let numbers: Vec<_> = page.items.iter().map(|t| t.ticket_number.as_str()).collect();
        assert_eq!(numbers, vec!["new", "mid"]);

        let intake = store
            .list_tickets(org, &TicketQuery { status: Some(TicketStatus::Intake), offset: 1, limit: 10 })
            .await
            .unwrap();
        assert_eq!(intake.total, 2);
        assert_eq!(intake.items[0].ticket_number, "old");
    }

    fn entry(organization_id: Uuid, ticket_id: Uuid, action: AuditAction, previous: Option<Value>, data: Value) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            ticket_id: Some(ticket_id),
            organization_id,
            user_id: None,
            action,
            entity_type: EntityType::Ticket,
            entity_id: ticket_id,
            previous_data: previous,
            new_data: data,
            timestamp: Utc::now(),
            ip_address: None,
            user_agent: None,
        }
    }

    fn status_entry(status: TicketStatus) -> impl Fn(&Ticket) -> AuditLog + Send + Sync {
        move |previous: &Ticket| {
            entry(
                previous.organization_id,
                previous.id,
                AuditAction::StatusUpdated,
                Some(json!({ "status": previous.status })),
                json!({ "status": status }),
            )
        }
    }

    fn draft_permit(organization_id: Uuid, ticket_id: Uuid) -> Permit {
        let now = Utc::now();
        Permit {
            id: Uuid::new_v4(),
            ticket_id,
            organization_id,
            permit_number: None,
            municipality: "Austin".to_string(),
            permit_type: "ROW".to_string(),
            application_data: json!({}),
            prefilled_data: json!({}),
            fee: rust_decimal::Decimal::new(7500, 2),
            status: PermitStatus::Draft,
            submitted_at: None,
            approved_at: None,
            pdf_path: None,
            xml_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn status_update_is_scoped_to_organization() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let t = ticket(org, "TX-9", TicketStatus::Intake, 0);
        store.insert_ticket(&t, None).await.unwrap();

        let err = store
            .update_ticket_status(Uuid::new_v4(), t.id, TicketStatus::Closed, Utc::now(), &status_entry(TicketStatus::Closed))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Ticket")));
        assert_eq!(store.count_audit(org).await.unwrap(), 0);

        let updated = store
            .update_ticket_status(org, t.id, TicketStatus::Closed, Utc::now(), &status_entry(TicketStatus::Closed))
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Closed);

        let trail = store.list_audit_for_ticket(org, t.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].previous_data, Some(json!({ "status": "INTAKE" })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_status_updates_chain_previous_status() {
        let store = Arc::new(MemoryStore::new());
        let org = Uuid::new_v4();
        let t = ticket(org, "TX-10", TicketStatus::Intake, 0);
        store.insert_ticket(&t, None).await.unwrap();

        let statuses = [
            TicketStatus::PermitFiled,
            TicketStatus::InspectionScheduled,
            TicketStatus::FieldWork,
            TicketStatus::Closed,
        ];
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            let status = statuses[i % statuses.len()];
            handles.push(tokio::spawn(async move {
                store
                    .update_ticket_status(org, t.id, status, Utc::now(), &status_entry(status))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut trail = store.list_audit_for_ticket(org, t.id).await.unwrap();
        trail.reverse();
        assert_eq!(trail.len(), 32);
        assert_eq!(trail[0].previous_data, Some(json!({ "status": "INTAKE" })));
        for pair in trail.windows(2) {
            assert_eq!(pair[1].previous_data.as_ref(), Some(&pair[0].new_data));
        }
    }

    #[tokio::test]
    async fn audited_insert_stores_both_or_neither() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let t = ticket(org, "TX-11", TicketStatus::Intake, 0);
        let created = entry(org, t.id, AuditAction::TicketCreated, None, json!({ "status": "INTAKE" }));

        store.insert_ticket(&t, Some(&created)).await.unwrap();
        assert_eq!(store.count_audit(org).await.unwrap(), 1);

        let duplicate = ticket(org, "TX-11", TicketStatus::Intake, 0);
        let rejected = entry(org, duplicate.id, AuditAction::TicketCreated, None, json!({}));
        let err = store.insert_ticket(&duplicate, Some(&rejected)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_audit(org).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn permit_change_applies_once_under_contention() {
        let store = Arc::new(MemoryStore::new());
        let org = Uuid::new_v4();
        let permit = draft_permit(org, Uuid::new_v4());
        store.insert_permit(&permit, None).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let submit = |current: &Permit| -> StoreResult<(Permit, AuditLog)> {
                    if current.status != PermitStatus::Draft {
                        return Err(StoreError::Conflict("already submitted".to_string()));
                    }
                    let mut next = current.clone();
                    next.status = PermitStatus::Submitted;
                    let log = entry(
                        org,
                        current.ticket_id,
                        AuditAction::PermitSubmitted,
                        Some(json!({ "status": current.status })),
                        json!({ "status": next.status }),
                    );
                    Ok((next, log))
                };
                store.modify_permit(org, permit.id, &submit).await
            }));
        }

        let mut submitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(p) => {
                    assert_eq!(p.status, PermitStatus::Submitted);
                    submitted += 1;
                }
                Err(err) => assert!(matches!(err, StoreError::Conflict(_))),
            }
        }
        assert_eq!(submitted, 1);
        assert_eq!(store.count_audit(org).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_permit_change_leaves_row_and_trail_untouched() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let permit = draft_permit(org, Uuid::new_v4());
        store.insert_permit(&permit, None).await.unwrap();

        let reject = |_: &Permit| -> StoreResult<(Permit, AuditLog)> {
            Err(StoreError::Conflict("no".to_string()))
        };
        assert!(store.modify_permit(org, permit.id, &reject).await.is_err());

        let stored = store.get_permit(org, permit.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PermitStatus::Draft);
        assert_eq!(store.count_audit(org).await.unwrap(), 0);

        let missing = store.modify_permit(Uuid::new_v4(), permit.id, &reject).await.unwrap_err();
        assert!(matches!(missing, StoreError::NotFound("Permit")));
    }

    #[tokio::test]
    async fn audit_counts_group_system_actor_separately() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        for actor in [Some(user), Some(user), None] {
            store
                .append_audit(&AuditLog {
                    id: Uuid::new_v4(),
                    ticket_id: None,
                    organization_id: org,
                    user_id: actor,
                    action: AuditAction::StatusUpdated,
                    entity_type: EntityType::Ticket,
                    entity_id: Uuid::new_v4(),
                    previous_data: None,
                    new_data: serde_json::json!({}),
                    timestamp: Utc::now(),
                    ip_address: None,
                    user_agent: None,
                })
                .await
                .unwrap();
        }

        let by_user = store.audit_counts_by_user(org).await.unwrap();
        assert_eq!(by_user[0], (Some(user), 2));
        assert_eq!(by_user[1], (None, 1));
        assert_eq!(store.count_audit(org).await.unwrap(), 3);
    }
}
