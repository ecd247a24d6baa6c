// 811 ticket intake and the status lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::audit_service::{Actor, AuditEntry};
use super::{ServiceError, ServiceResult};
use crate::database::models::{AuditAction, EntityType, Ticket, TicketStatus, UtilityType};
use crate::database::{Page, Store, TicketQuery};

/// Centre of the mock geocoder (Austin, TX)
const GEOCODE_ORIGIN: (f64, f64) = (30.2672, -97.7431);
const GEOCODE_SPREAD: f64 = 0.05;

/// Raw one-call notice as delivered by the 811 center. Every field is optional so
/// that validation can report all problems at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Raw811Notice {
    pub ticket_number: Option<String>,
    pub request_date: Option<String>,
    pub work_start_date: Option<String>,
    pub work_end_date: Option<String>,
    pub excavator_company: Option<String>,
    pub excavator_contact: Option<ExcavatorContact>,
    pub work_location: Option<WorkLocation>,
    pub work_description: Option<String>,
    #[serde(default)]
    pub utility_types: Vec<String>,
    pub emergency_contact: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcavatorContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLocation {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Notice fields after validation and normalization
#[derive(Debug, Clone)]
pub struct ValidatedNotice {
    pub ticket_number: Option<String>,
    pub excavator_name: String,
    pub excavator_phone: String,
    pub excavator_email: Option<String>,
    pub work_address: String,
    pub coordinates: Option<Coordinates>,
    pub utility_types: Vec<UtilityType>,
    pub work_start_date: DateTime<Utc>,
    pub work_end_date: DateTime<Utc>,
    pub work_description: String,
    pub emergency_contact: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Map free-form utility names to known types, dropping unknowns and duplicates
pub fn normalize_utility_types(names: &[String]) -> Vec<UtilityType> {
    let mut types = Vec::new();
    for name in names {
        let normalized = match name.trim().to_lowercase().as_str() {
            "electric" | "electricity" | "power" => Some(UtilityType::Electric),
            "gas" | "natural gas" => Some(UtilityType::Gas),
            "water" => Some(UtilityType::Water),
            "sewer" | "wastewater" => Some(UtilityType::Sewer),
            "telecom" | "telephone" => Some(UtilityType::Telecom),
            "cable" => Some(UtilityType::Cable),
            "fiber" | "fiber optic" => Some(UtilityType::Fiber),
            _ => None,
        };
        if let Some(utility) = normalized {
            if !types.contains(&utility) {
                types.push(utility);
            }
        }
    }
    types
}

/// Check a notice, collecting every error rather than stopping at the first
pub fn validate_notice(notice: &Raw811Notice) -> Result<ValidatedNotice, Vec<String>> {
    let mut errors = Vec::new();
    let contact = notice.excavator_contact.clone().unwrap_or_default();
    let location = notice.work_location.clone().unwrap_or_default();

    let company = present(&notice.excavator_company);
    if company.is_none() {
        errors.push("Excavator company is required".to_string());
    }
    let phone = present(&contact.phone);
    if phone.is_none() {
        errors.push("Excavator phone is required".to_string());
    }
    let address = present(&location.address);
    if address.is_none() {
        errors.push("Work address is required".to_string());
    }

    let start = match present(&notice.work_start_date) {
        None => {
            errors.push("Work start date is required".to_string());
            None
        }
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.push("Work start date is not a valid date".to_string());
            }
            parsed
        }
    };
    let end = match present(&notice.work_end_date) {
        None => {
            errors.push("Work end date is required".to_string());
            None
        }
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.push("Work end date is not a valid date".to_string());
            }
            parsed
        }
    };

    let description = present(&notice.work_description);
    if description.is_none() {
        errors.push("Work description is required".to_string());
    }

    let utility_types = normalize_utility_types(&notice.utility_types);
    if notice.utility_types.is_empty() {
        errors.push("At least one utility type is required".to_string());
    } else if utility_types.is_empty() {
        errors.push("At least one recognized utility type is required".to_string());
    }

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            errors.push("Work start date must be before end date".to_string());
        }
    }

    if let Some(c) = location.coordinates {
        let in_range = (-90.0..=90.0).contains(&c.latitude) && (-180.0..=180.0).contains(&c.longitude);
        if !in_range {
            errors.push("Coordinates are out of range".to_string());
        }
    }

    match (company, phone, address, start, end, description) {
        (Some(company), Some(phone), Some(address), Some(start), Some(end), Some(description))
            if errors.is_empty() =>
        {
            let mut work_address = address.to_string();
            if let Some(city) = present(&location.city) {
                work_address.push_str(&format!(", {}", city));
            }
            let region = [present(&location.state), present(&location.zip)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if !region.is_empty() {
                work_address.push_str(&format!(", {}", region));
            }

            Ok(ValidatedNotice {
                ticket_number: present(&notice.ticket_number).map(str::to_string),
                excavator_name: company.to_string(),
                excavator_phone: phone.to_string(),
                excavator_email: present(&contact.email).map(str::to_string),
                work_address,
                coordinates: location.coordinates,
                utility_types,
                work_start_date: start,
                work_end_date: end,
                work_description: description.to_string(),
                emergency_contact: present(&notice.emergency_contact).map(str::to_string),
            })
        }
        _ => Err(errors),
    }
}

/// `TX811-<unix millis>-<3 digits>`
pub fn generate_ticket_number() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!("TX811-{}-{:03}", Utc::now().timestamp_millis(), suffix)
}

/// Mock geocoder: a point near the service area centre
pub fn geocode(address: &str) -> Coordinates {
    let mut rng = rand::thread_rng();
    let coordinates = Coordinates {
        latitude: GEOCODE_ORIGIN.0 + rng.gen_range(-GEOCODE_SPREAD..GEOCODE_SPREAD),
        longitude: GEOCODE_ORIGIN.1 + rng.gen_range(-GEOCODE_SPREAD..GEOCODE_SPREAD),
    };
    tracing::debug!(
        "Geocoded '{}' to {}, {}",
        address,
        coordinates.latitude,
        coordinates.longitude
    );
    coordinates
}

pub struct TicketService {
    store: Arc<dyn Store>,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Validate, normalize and persist a raw notice as an `INTAKE` ticket
    pub async fn import(&self, actor: &Actor, source: &str, payload: Value) -> ServiceResult<Ticket> {
        let notice: Raw811Notice = serde_json::from_value(payload.clone())
            .map_err(|e| ServiceError::Validation(vec![format!("Malformed notice: {}", e)]))?;
        let notice = validate_notice(&notice).map_err(ServiceError::Validation)?;

        let coordinates = notice
            .coordinates
            .unwrap_or_else(|| geocode(&notice.work_address));
        let now = Utc::now();

        let ticket = Ticket {
            id: Uuid::new_v4(),
            organization_id: actor.organization_id,
            ticket_number: notice.ticket_number.unwrap_or_else(generate_ticket_number),
            source: source.to_string(),
            status: TicketStatus::Intake,
            excavator_name: notice.excavator_name,
            excavator_phone: notice.excavator_phone,
            excavator_email: notice.excavator_email,
            work_address: notice.work_address,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            utility_types: notice.utility_types,
            work_start_date: notice.work_start_date,
            work_end_date: notice.work_end_date,
            work_description: notice.work_description,
            emergency_contact: notice.emergency_contact,
            raw_data: payload,
            created_at: now,
            updated_at: now,
        };

        let created = AuditEntry::new(AuditAction::TicketCreated, EntityType::Ticket, ticket.id)
            .ticket(ticket.id)
            .data(json!(ticket))
            .by(actor);
        self.store.insert_ticket(&ticket, Some(&created)).await?;

        tracing::info!(
            "Imported ticket {} ({}) for organization {}",
            ticket.ticket_number,
            ticket.id,
            ticket.organization_id
        );
        Ok(ticket)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> ServiceResult<Ticket> {
        self.store
            .get_ticket(organization_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Ticket"))
    }

    /// Page of tickets, each with permit and inspection summaries and record counts
    pub async fn list(&self, organization_id: Uuid, query: &TicketQuery) -> ServiceResult<(Vec<Value>, u64)> {
        let Page { items, total } = self.store.list_tickets(organization_id, query).await?;
        if items.is_empty() {
            return Ok((Vec::new(), total));
        }

        let mut permits: HashMap<Uuid, Vec<Value>> = HashMap::new();
        for p in self.store.list_permits(organization_id, None).await? {
            permits
                .entry(p.ticket_id)
                .or_default()
                .push(json!({ "id": p.id, "status": p.status, "municipality": p.municipality }));
        }
        let mut inspections: HashMap<Uuid, Vec<Value>> = HashMap::new();
        for i in self.store.list_inspections(organization_id, None).await? {
            inspections
                .entry(i.ticket_id)
                .or_default()
                .push(json!({ "id": i.id, "status": i.status, "scheduledDate": i.scheduled_date }));
        }
        let mut evidence_counts: HashMap<Uuid, u64> = HashMap::new();
        for e in self.store.list_evidence(organization_id, None).await? {
            *evidence_counts.entry(e.ticket_id).or_default() += 1;
        }
        let mut fee_counts: HashMap<Uuid, u64> = HashMap::new();
        for f in self.store.list_fees(organization_id, None).await? {
            *fee_counts.entry(f.ticket_id).or_default() += 1;
        }

        let tickets = items
            .into_iter()
            .map(|ticket| {
                let id = ticket.id;
                let mut value = json!(ticket);
                value["permits"] = json!(permits.remove(&id).unwrap_or_default());
                value["inspections"] = json!(inspections.remove(&id).unwrap_or_default());
                value["counts"] = json!({
                    "evidence": evidence_counts.get(&id).copied().unwrap_or(0),
                    "fees": fee_counts.get(&id).copied().unwrap_or(0),
                });
                value
            })
            .collect();

        Ok((tickets, total))
    }

    /// Ticket with every related record
    pub async fn detail(&self, organization_id: Uuid, id: Uuid) -> ServiceResult<Value> {
        let ticket = self.get(organization_id, id).await?;
        let store = &self.store;

        let mut value = json!(ticket);
        value["permits"] = json!(store.list_permits(organization_id, Some(id)).await?);
        value["trafficPlans"] = json!(store.list_traffic_plans(organization_id, Some(id)).await?);
        value["inspections"] = json!(store.list_inspections(organization_id, Some(id)).await?);
        value["evidence"] = json!(store.list_evidence(organization_id, Some(id)).await?);
        value["fees"] = json!(store.list_fees(organization_id, Some(id)).await?);
        Ok(value)
    }

    /// Set any status from any status and record the change
    pub async fn update_status(&self, actor: &Actor, id: Uuid, status: TicketStatus) -> ServiceResult<Ticket> {
        let audit = |previous: &Ticket| {
            AuditEntry::new(AuditAction::StatusUpdated, EntityType::Ticket, id)
                .ticket(id)
                .previous(json!({ "status": previous.status }))
                .data(json!({ "status": status }))
                .by(actor)
        };
        let updated = self
            .store
            .update_ticket_status(actor.organization_id, id, status, Utc::now(), &audit)
            .await?;

        tracing::info!("Ticket {} status -> {}", updated.ticket_number, status);
        Ok(updated)
    }
}
