// Append-only audit trail: recording entries and shaping them for review and export.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::{AuditAction, AuditLog, EntityType, TicketStatus, User};
use crate::database::Store;

/// Who performed an action, and from where. `user_id` is `None` for the system.
#[derive(Debug, Clone)]
pub struct Actor {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn user(organization_id: Uuid, user_id: Uuid) -> Self {
        Self {
            organization_id,
            user_id: Some(user_id),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn system(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            user_id: None,
            ip_address: None,
            user_agent: None,
        }
    }
}

/// An entry about to be appended
#[derive(Debug, Clone)]
pub struct AuditEntry {
    action: AuditAction,
    entity_type: EntityType,
    entity_id: Uuid,
    ticket_id: Option<Uuid>,
    previous_data: Option<Value>,
    new_data: Value,
}

impl AuditEntry {
    pub fn new(action: AuditAction, entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            action,
            entity_type,
            entity_id,
            ticket_id: None,
            previous_data: None,
            new_data: json!({}),
        }
    }

    pub fn ticket(mut self, ticket_id: Uuid) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    pub fn previous(mut self, data: Value) -> Self {
        self.previous_data = Some(data);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.new_data = data;
        self
    }

    /// Stamp the entry with its actor and time, ready to be stored alongside a mutation
    pub fn by(self, actor: &Actor) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            ticket_id: self.ticket_id,
            organization_id: actor.organization_id,
            user_id: actor.user_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            previous_data: self.previous_data,
            new_data: self.new_data,
            timestamp: Utc::now(),
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        }
    }
}

/// One step of a ticket's reconstructed status timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: Option<TicketStatus>,
    pub to: TicketStatus,
    pub at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

/// Rebuild the status timeline from chronological audit entries
pub fn status_history(entries: &[AuditLog]) -> Vec<StatusChange> {
    let status_in = |data: Option<&Value>| -> Option<TicketStatus> {
        data?.get("status")?.as_str()?.parse().ok()
    };

    let mut history = Vec::new();
    for entry in entries {
        match entry.action {
            AuditAction::TicketCreated => history.push(StatusChange {
                from: None,
                to: status_in(Some(&entry.new_data)).unwrap_or(TicketStatus::Intake),
                at: entry.timestamp,
                user_id: entry.user_id,
            }),
            AuditAction::StatusUpdated => {
                let Some(to) = status_in(Some(&entry.new_data)) else {
                    tracing::warn!("Audit entry {} has no readable status", entry.id);
                    continue;
                };
                let from = status_in(entry.previous_data.as_ref())
                    .or_else(|| history.last().map(|c: &StatusChange| c.to));
                history.push(StatusChange {
                    from,
                    to,
                    at: entry.timestamp,
                    user_id: entry.user_id,
                });
            }
            _ => {}
        }
    }
    history
}

pub struct AuditService {
    store: Arc<dyn Store>,
}

impl AuditService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append a standalone entry, for actions whose only durable effect is the entry itself.
    /// Row mutations hand their entry to the store instead.
    pub async fn record(&self, actor: &Actor, entry: AuditEntry) -> ServiceResult<AuditLog> {
        let log = entry.by(actor);
        self.store.append_audit(&log).await?;
        tracing::debug!("Audit {} on {} {}", log.action, log.entity_type, log.entity_id);
        Ok(log)
    }

    async fn users_by_id(&self, entries: &[AuditLog]) -> ServiceResult<HashMap<Uuid, User>> {
        let mut users = HashMap::new();
        for user_id in entries.iter().filter_map(|e| e.user_id) {
            if users.contains_key(&user_id) {
                continue;
            }
            if let Some(user) = self.store.get_user(user_id).await? {
                users.insert(user_id, user);
            }
        }
        Ok(users)
    }

    /// Entries for one ticket, newest first, each with its actor
    pub async fn ticket_trail(&self, organization_id: Uuid, ticket_id: Uuid) -> ServiceResult<Vec<Value>> {
        self.store
            .get_ticket(organization_id, ticket_id)
            .await?
            .ok_or(ServiceError::NotFound("Ticket"))?;

        let entries = self.store.list_audit_for_ticket(organization_id, ticket_id).await?;
        let users = self.users_by_id(&entries).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let user = entry.user_id.and_then(|id| users.get(&id)).map(User::actor);
                let mut value = json!(entry);
                value["user"] = user.unwrap_or(Value::Null);
                value
            })
            .collect())
    }

    /// Complete compliance package for a ticket
    pub async fn export(&self, organization_id: Uuid, ticket_id: Uuid, exported_by: &str) -> ServiceResult<Value> {
        let store = &self.store;
        let ticket = store
            .get_ticket(organization_id, ticket_id)
            .await?
            .ok_or(ServiceError::NotFound("Ticket"))?;

        let permits = store.list_permits(organization_id, Some(ticket_id)).await?;
        let plans = store.list_traffic_plans(organization_id, Some(ticket_id)).await?;
        let inspections = store.list_inspections(organization_id, Some(ticket_id)).await?;
        let evidence = store.list_evidence(organization_id, Some(ticket_id)).await?;
        let fees = store.list_fees(organization_id, Some(ticket_id)).await?;

        let mut trail = store.list_audit_for_ticket(organization_id, ticket_id).await?;
        trail.reverse();
        let users = self.users_by_id(&trail).await?;

        let audit_trail: Vec<Value> = trail
            .iter()
            .map(|log| {
                let user = log.user_id.and_then(|id| users.get(&id));
                json!({
                    "timestamp": log.timestamp,
                    "action": log.action,
                    "entityType": log.entity_type,
                    "user": user.map(|u| u.name.as_str()).unwrap_or("System"),
                    "userRole": user.map(|u| json!(u.role)).unwrap_or(Value::Null),
                    "previousData": log.previous_data,
                    "newData": log.new_data,
                })
            })
            .collect();

        Ok(json!({
            "exportedAt": Utc::now(),
            "exportedBy": exported_by,
            "ticket": {
                "basic": {
                    "ticketNumber": ticket.ticket_number,
                    "status": ticket.status,
                    "workAddress": ticket.work_address,
                    "excavatorName": ticket.excavator_name,
                    "workDescription": ticket.work_description,
                    "workStartDate": ticket.work_start_date,
                    "workEndDate": ticket.work_end_date,
                    "createdAt": ticket.created_at,
                },
                "permits": permits.iter().map(|p| json!({
                    "permitNumber": p.permit_number,
                    "municipality": p.municipality,
                    "permitType": p.permit_type,
                    "status": p.status,
                    "fee": p.fee,
                    "submittedAt": p.submitted_at,
                    "approvedAt": p.approved_at,
                })).collect::<Vec<_>>(),
                "trafficPlans": plans.iter().map(|t| json!({
                    "templateName": t.template_name,
                    "createdAt": t.created_at,
                    "pdfPath": t.pdf_path,
                })).collect::<Vec<_>>(),
                "inspections": inspections.iter().map(|i| json!({
                    "inspectionType": i.inspection_type,
                    "scheduledDate": i.scheduled_date,
                    "inspector": i.inspector,
                    "status": i.status,
                    "completedAt": i.completed_at,
                })).collect::<Vec<_>>(),
                "evidence": evidence.iter().map(|e| json!({
                    "type": e.evidence_type,
                    "title": e.title,
                    "fileType": e.file_type,
                    "capturedAt": e.captured_at,
                    "gpsLatitude": e.gps_latitude,
                    "gpsLongitude": e.gps_longitude,
                })).collect::<Vec<_>>(),
                "fees": fees.iter().map(|f| json!({
                    "type": f.fee_type,
                    "description": f.description,
                    "amount": f.amount,
                    "status": f.status,
                    "dueDate": f.due_date,
                    "paidDate": f.paid_date,
                })).collect::<Vec<_>>(),
                "auditTrail": audit_trail,
                "statusHistory": status_history(&trail),
            }
        }))
    }

    /// Organization-wide activity overview
    pub async fn organization_summary(&self, organization_id: Uuid) -> ServiceResult<Value> {
        let total_actions = self.store.count_audit(organization_id).await?;
        let recent = self.store.list_recent_audit(organization_id, 50).await?;
        let by_action = self.store.audit_counts_by_action(organization_id).await?;
        let by_user = self.store.audit_counts_by_user(organization_id).await?;
        let users = self.users_by_id(&recent).await?;

        let mut ticket_numbers: HashMap<Uuid, String> = HashMap::new();
        for ticket_id in recent.iter().filter_map(|e| e.ticket_id) {
            if ticket_numbers.contains_key(&ticket_id) {
                continue;
            }
            if let Some(ticket) = self.store.get_ticket(organization_id, ticket_id).await? {
                ticket_numbers.insert(ticket_id, ticket.ticket_number);
            }
        }

        let recent_actions: Vec<Value> = recent
            .into_iter()
            .map(|entry| {
                let user = entry
                    .user_id
                    .and_then(|id| users.get(&id))
                    .map(|u| json!({ "name": u.name, "role": u.role }))
                    .unwrap_or(Value::Null);
                let ticket = entry
                    .ticket_id
                    .and_then(|id| ticket_numbers.get(&id))
                    .map(|number| json!({ "ticketNumber": number }))
                    .unwrap_or(Value::Null);
                let mut value = json!(entry);
                value["user"] = user;
                value["ticket"] = ticket;
                value
            })
            .collect();

        Ok(json!({
            "totalActions": total_actions,
            "recentActions": recent_actions,
            "actionsByType": by_action
                .into_iter()
                .map(|(action, count)| json!({ "action": action, "count": count }))
                .collect::<Vec<_>>(),
            "actionsByUser": by_user
                .into_iter()
                .map(|(user_id, count)| json!({ "userId": user_id, "count": count }))
                .collect::<Vec<_>>(),
        }))
    }
}
