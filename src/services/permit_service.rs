// Permit drafting, application edits and mock municipal submission.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::audit_service::{Actor, AuditEntry};
use super::{ServiceError, ServiceResult};
use crate::database::models::{AuditAction, AuditLog, EntityType, Permit, PermitStatus, Ticket};
use crate::database::{Store, StoreError, StoreResult};

/// Flat permit application fee, in cents
pub const DRAFT_PERMIT_FEE_CENTS: i64 = 7500;

/// Application fields derived from a ticket
pub fn prefill_data(ticket: &Ticket, municipality: &str, permit_type: &str) -> Value {
    json!({
        "applicantName": ticket.excavator_name,
        "applicantPhone": ticket.excavator_phone,
        "applicantEmail": ticket.excavator_email,
        "workAddress": ticket.work_address,
        "workDescription": ticket.work_description,
        "workStartDate": ticket.work_start_date.format("%Y-%m-%d").to_string(),
        "workEndDate": ticket.work_end_date.format("%Y-%m-%d").to_string(),
        "utilityTypes": ticket.utility_types,
        "emergencyContact": ticket.emergency_contact,
        "municipality": municipality,
        "permitType": permit_type,
        "estimatedCost": "$2,500",
        "trafficControlRequired": ticket.utility_types.iter().any(|u| u.requires_traffic_control()),
        "specialRequirements": "Standard utility installation",
    })
}

/// `Travis County` -> `TRAVIS-COUNTY`
pub fn municipality_slug(municipality: &str) -> String {
    municipality
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '-' })
        .collect()
}

pub struct PermitService {
    store: Arc<dyn Store>,
}

impl PermitService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> ServiceResult<Permit> {
        self.store
            .get_permit(organization_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Permit"))
    }

    /// Permits newest first, each with a short reference to its ticket
    pub async fn list(&self, organization_id: Uuid) -> ServiceResult<Vec<Value>> {
        let permits = self.store.list_permits(organization_id, None).await?;

        let mut tickets: HashMap<Uuid, Option<Value>> = HashMap::new();
        let mut listed = Vec::with_capacity(permits.len());
        for permit in permits {
            if !tickets.contains_key(&permit.ticket_id) {
                let reference = self
                    .store
                    .get_ticket(organization_id, permit.ticket_id)
                    .await?
                    .map(|t| t.reference());
                tickets.insert(permit.ticket_id, reference);
            }
            let mut value = json!(permit);
            value["ticket"] = tickets.get(&permit.ticket_id).cloned().flatten().unwrap_or(Value::Null);
            listed.push(value);
        }
        Ok(listed)
    }

    /// Permit with its full ticket
    pub async fn detail(&self, organization_id: Uuid, id: Uuid) -> ServiceResult<Value> {
        let permit = self.get(organization_id, id).await?;
        let ticket = self.store.get_ticket(organization_id, permit.ticket_id).await?;

        let mut value = json!(permit);
        value["ticket"] = json!(ticket);
        Ok(value)
    }

    /// Create a `DRAFT` permit whose application is prefilled from the ticket
    pub async fn create_prefilled_permit(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        municipality: &str,
        permit_type: &str,
    ) -> ServiceResult<Permit> {
        let mut errors = Vec::new();
        if municipality.trim().is_empty() {
            errors.push("Municipality is required".to_string());
        }
        if permit_type.trim().is_empty() {
            errors.push("Permit type is required".to_string());
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let ticket = self
            .store
            .get_ticket(actor.organization_id, ticket_id)
            .await?
            .ok_or(ServiceError::NotFound("Ticket"))?;

        let prefilled = prefill_data(&ticket, municipality, permit_type);
        let now = Utc::now();
        let permit = Permit {
            id: Uuid::new_v4(),
            ticket_id,
            organization_id: actor.organization_id,
            permit_number: None,
            municipality: municipality.to_string(),
            permit_type: permit_type.to_string(),
            application_data: prefilled.clone(),
            prefilled_data: prefilled,
            fee: Decimal::new(DRAFT_PERMIT_FEE_CENTS, 2),
            status: PermitStatus::Draft,
            submitted_at: None,
            approved_at: None,
            pdf_path: None,
            xml_path: None,
            created_at: now,
            updated_at: now,
        };
        let created = AuditEntry::new(AuditAction::PermitCreated, EntityType::Permit, permit.id)
            .ticket(ticket_id)
            .data(json!({
                "municipality": permit.municipality,
                "permitType": permit.permit_type,
                "status": permit.status,
            }))
            .by(actor);
        self.store.insert_permit(&permit, Some(&created)).await?;

        tracing::info!("Drafted permit {} for ticket {}", permit.id, ticket.ticket_number);
        Ok(permit)
    }

    /// Shallow-merge `changes` into the application data
    pub async fn update_application(&self, actor: &Actor, id: Uuid, changes: Value) -> ServiceResult<Permit> {
        let Value::Object(changes) = changes else {
            return Err(ServiceError::Validation(vec![
                "Application data must be a JSON object".to_string(),
            ]));
        };

        let merge = |current: &Permit| -> StoreResult<(Permit, AuditLog)> {
            let mut permit = current.clone();
            let mut merged = match &current.application_data {
                Value::Object(map) => map.clone(),
                _ => Map::new(),
            };
            merged.extend(changes.clone());
            permit.application_data = Value::Object(merged);
            permit.updated_at = Utc::now();

            let log = AuditEntry::new(AuditAction::PermitUpdated, EntityType::Permit, permit.id)
                .ticket(permit.ticket_id)
                .previous(current.application_data.clone())
                .data(permit.application_data.clone())
                .by(actor);
            Ok((permit, log))
        };

        Ok(self.store.modify_permit(actor.organization_id, id, &merge).await?)
    }

    /// Mock portal submission: assigns a permit number and moves the permit to `SUBMITTED`
    pub async fn submit(&self, actor: &Actor, id: Uuid) -> ServiceResult<Permit> {
        let submit = |current: &Permit| -> StoreResult<(Permit, AuditLog)> {
            if current.status != PermitStatus::Draft {
                return Err(StoreError::Conflict(format!(
                    "Permit is {} and cannot be submitted",
                    current.status
                )));
            }

            let now = Utc::now();
            let mut permit = current.clone();
            permit.permit_number = Some(format!(
                "{}-{}",
                municipality_slug(&permit.municipality),
                now.timestamp_millis()
            ));
            permit.status = PermitStatus::Submitted;
            permit.submitted_at = Some(now);
            permit.updated_at = now;

            let log = AuditEntry::new(AuditAction::PermitSubmitted, EntityType::Permit, permit.id)
                .ticket(permit.ticket_id)
                .previous(json!({ "status": current.status }))
                .data(json!({
                    "status": permit.status,
                    "permitNumber": permit.permit_number,
                    "submittedAt": permit.submitted_at,
                }))
                .by(actor);
            Ok((permit, log))
        };

        let permit = self.store.modify_permit(actor.organization_id, id, &submit).await?;

        tracing::info!(
            "Submitted permit {} as {}",
            permit.id,
            permit.permit_number.as_deref().unwrap_or_default()
        );
        Ok(permit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{TicketStatus, UtilityType};
    use crate::database::MemoryStore;
    use chrono::TimeZone;

    fn ticket(organization_id: Uuid, utilities: Vec<UtilityType>) -> Ticket {
        let start = Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap();
        Ticket {
            id: Uuid::new_v4(),
            organization_id,
            ticket_number: "TX-811-2025-00042".to_string(),
            source: "811".to_string(),
            status: TicketStatus::Intake,
            excavator_name: "Hill Country Excavation".to_string(),
            excavator_phone: "(512) 555-0100".to_string(),
            excavator_email: None,
            work_address: "100 Lamar Blvd, Austin, TX 78704".to_string(),
            latitude: 30.26,
            longitude: -97.75,
            utility_types: utilities,
            work_start_date: start,
            work_end_date: start + chrono::Duration::days(2),
            work_description: "Service line replacement".to_string(),
            emergency_contact: None,
            raw_data: json!({}),
            created_at: start,
            updated_at: start,
        }
    }

    async fn setup(utilities: Vec<UtilityType>) -> (PermitService, Arc<MemoryStore>, Actor, Ticket) {
        let store = Arc::new(MemoryStore::new());
        let actor = Actor::user(Uuid::new_v4(), Uuid::new_v4());
        let ticket = ticket(actor.organization_id, utilities);
        store.insert_ticket(&ticket, None).await.unwrap();
        (PermitService::new(store.clone()), store, actor, ticket)
    }

    #[test]
    fn prefill_flags_traffic_control() {
        let t = ticket(Uuid::new_v4(), vec![UtilityType::Water, UtilityType::Gas]);
        let data = prefill_data(&t, "Austin", "ROW");
        assert_eq!(data["trafficControlRequired"], json!(true));
        assert_eq!(data["workStartDate"], "2025-03-04");
        assert_eq!(data["workEndDate"], "2025-03-06");
        assert_eq!(data["estimatedCost"], "$2,500");

        let t = ticket(Uuid::new_v4(), vec![UtilityType::Water]);
        assert_eq!(prefill_data(&t, "Austin", "ROW")["trafficControlRequired"], json!(false));
    }

    #[test]
    fn slug_uppercases_and_dashes() {
        assert_eq!(municipality_slug("Travis County"), "TRAVIS-COUNTY");
        assert_eq!(municipality_slug(" austin "), "AUSTIN");
    }

    #[tokio::test]
    async fn draft_carries_fee_and_audit() {
        let (service, store, actor, ticket) = setup(vec![UtilityType::Fiber]).await;
        let permit = service
            .create_prefilled_permit(&actor, ticket.id, "Austin", "Right-of-Way")
            .await
            .unwrap();

        assert_eq!(permit.status, PermitStatus::Draft);
        assert_eq!(permit.fee.to_string(), "75.00");
        assert_eq!(permit.application_data, permit.prefilled_data);

        let trail = store.list_audit_for_ticket(actor.organization_id, ticket.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::PermitCreated);
    }

    #[tokio::test]
    async fn prefill_for_foreign_ticket_is_not_found() {
        let (service, _store, _actor, ticket) = setup(vec![UtilityType::Water]).await;
        let stranger = Actor::user(Uuid::new_v4(), Uuid::new_v4());
        let err = service
            .create_prefilled_permit(&stranger, ticket.id, "Austin", "ROW")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Ticket")));
    }

    #[tokio::test]
    async fn update_merges_shallowly() {
        let (service, store, actor, ticket) = setup(vec![UtilityType::Water]).await;
        let permit = service
            .create_prefilled_permit(&actor, ticket.id, "Austin", "ROW")
            .await
            .unwrap();

        let updated = service
            .update_application(&actor, permit.id, json!({ "estimatedCost": "$3,000", "crewSize": 4 }))
            .await
            .unwrap();
        assert_eq!(updated.application_data["estimatedCost"], "$3,000");
        assert_eq!(updated.application_data["crewSize"], 4);
        assert_eq!(updated.application_data["municipality"], "Austin");
        assert_eq!(updated.prefilled_data["estimatedCost"], "$2,500");

        let trail = store.list_audit_for_ticket(actor.organization_id, ticket.id).await.unwrap();
        assert_eq!(trail[0].action, AuditAction::PermitUpdated);
        assert_eq!(trail[0].previous_data.as_ref().unwrap()["estimatedCost"], "$2,500");
    }

    #[tokio::test]
    async fn update_rejects_non_objects() {
        let (service, _store, actor, ticket) = setup(vec![UtilityType::Water]).await;
        let permit = service
            .create_prefilled_permit(&actor, ticket.id, "Austin", "ROW")
            .await
            .unwrap();
        let err = service
            .update_application(&actor, permit.id, json!(["not", "an", "object"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_only_once() {
        let (service, _store, actor, ticket) = setup(vec![UtilityType::Water]).await;
        let permit = service
            .create_prefilled_permit(&actor, ticket.id, "Round Rock", "ROW")
            .await
            .unwrap();

        let submitted = service.submit(&actor, permit.id).await.unwrap();
        assert_eq!(submitted.status, PermitStatus::Submitted);
        assert!(submitted.submitted_at.is_some());
        assert!(submitted.permit_number.unwrap().starts_with("ROUND-ROCK-"));

        let err = service.submit(&actor, permit.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_attaches_ticket_reference() {
        let (service, _store, actor, ticket) = setup(vec![UtilityType::Water]).await;
        service
            .create_prefilled_permit(&actor, ticket.id, "Austin", "ROW")
            .await
            .unwrap();

        let listed = service.list(actor.organization_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["ticket"]["ticketNumber"], "TX-811-2025-00042");
        assert_eq!(listed[0]["fee"], "75.00");
        assert!(service.list(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submits_assign_one_number() {
        let (service, store, actor, ticket) = setup(vec![UtilityType::Gas]).await;
        let permit = service
            .create_prefilled_permit(&actor, ticket.id, "Austin", "ROW")
            .await
            .unwrap();

        let service = Arc::new(service);
        let mut handles = Vec::new();
        for _ in 0..12 {
            let (service, actor) = (service.clone(), actor.clone());
            handles.push(tokio::spawn(async move { service.submit(&actor, permit.id).await }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(p) => numbers.push(p.permit_number),
                Err(err) => assert!(
                    matches!(&err, ServiceError::Conflict(msg) if msg == "Permit is SUBMITTED and cannot be submitted")
                ),
            }
        }
        assert_eq!(numbers.len(), 1);

        let submitted = store
            .list_audit_for_ticket(actor.organization_id, ticket.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == AuditAction::PermitSubmitted)
            .count();
        assert_eq!(submitted, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_application_edits_are_all_kept() {
        let (service, store, actor, ticket) = setup(vec![UtilityType::Water]).await;
        let permit = service
            .create_prefilled_permit(&actor, ticket.id, "Austin", "ROW")
            .await
            .unwrap();

        let service = Arc::new(service);
        let mut handles = Vec::new();
        for i in 0..10 {
            let (service, actor) = (service.clone(), actor.clone());
            let field = format!("note{}", i);
            handles.push(tokio::spawn(async move {
                service.update_application(&actor, permit.id, json!({ field: i })).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = service.get(actor.organization_id, permit.id).await.unwrap();
        for i in 0..10 {
            assert_eq!(stored.application_data[format!("note{}", i)], i);
        }
        assert_eq!(stored.application_data["municipality"], "Austin");
        assert_eq!(store.count_audit(actor.organization_id).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn missing_permit_is_not_found() {
        let (service, _store, actor, _ticket) = setup(vec![UtilityType::Water]).await;
        let err = service.submit(&actor, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Permit")));
    }
}
