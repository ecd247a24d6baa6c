// Demo organization with users, two tickets and a worked example of every field record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::database::models::{
    AuditAction, AuditLog, EntityType, Evidence, EvidenceType, Fee, FeeStatus, Inspection,
    InspectionStatus, Organization, Permit, PermitStatus, Ticket, TicketStatus, TrafficPlan, User,
    UserRole, UtilityType,
};
use crate::database::{Store, StoreError, StoreResult};

pub const DEMO_PASSWORD: &str = "password123";
pub const COORDINATOR_EMAIL: &str = "coordinator@austinutils.com";
pub const SUPERVISOR_EMAIL: &str = "supervisor@austinutils.com";
pub const MANAGER_EMAIL: &str = "compliance@austinutils.com";

/// Ids of the seeded records
#[derive(Debug, Clone, Copy)]
pub struct DemoData {
    pub organization_id: Uuid,
    pub coordinator_id: Uuid,
    pub supervisor_id: Uuid,
    pub manager_id: Uuid,
    /// Fiber install with permit, traffic plan, inspection, evidence and fee
    pub fiber_ticket_id: Uuid,
    /// Water main repair still at intake
    pub water_ticket_id: Uuid,
    pub permit_id: Uuid,
}

fn at(timestamp: &str) -> StoreResult<DateTime<Utc>> {
    timestamp
        .parse::<DateTime<Utc>>()
        .map_err(|e| StoreError::Corrupt(format!("bad seed timestamp {}: {}", timestamp, e)))
}

fn user(organization_id: Uuid, email: &str, name: &str, role: UserRole, password_hash: &str, now: DateTime<Utc>) -> User {
    User {
        id: Uuid::new_v4(),
        organization_id,
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        name: name.to_string(),
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Seed the demo organization. `password_cost` is the bcrypt work factor for the shared demo password.
pub async fn seed_demo_data(store: &dyn Store, password_cost: u32) -> StoreResult<DemoData> {
    let now = Utc::now();
    let password_hash = hash_password(DEMO_PASSWORD, password_cost)
        .map_err(|e| StoreError::Corrupt(format!("cannot hash demo password: {}", e)))?;

    let organization = Organization {
        id: Uuid::new_v4(),
        name: "Austin Utility Contractors".to_string(),
        code: "AUC".to_string(),
        address: "123 Business Drive, Austin, TX 78701".to_string(),
        contact_email: "info@austinutils.com".to_string(),
        contact_phone: "(512) 555-0100".to_string(),
        created_at: now,
        updated_at: now,
    };
    store.insert_organization(&organization).await?;
    let org = organization.id;

    let coordinator = user(org, COORDINATOR_EMAIL, "Sarah Johnson", UserRole::PermitCoordinator, &password_hash, now);
    let supervisor = user(org, SUPERVISOR_EMAIL, "Mike Rodriguez", UserRole::FieldSupervisor, &password_hash, now);
    let manager = user(org, MANAGER_EMAIL, "Jennifer Chen", UserRole::ComplianceManager, &password_hash, now);
    for u in [&coordinator, &supervisor, &manager] {
        store.insert_user(u, None).await?;
    }

    let fiber = Ticket {
        id: Uuid::new_v4(),
        organization_id: org,
        ticket_number: "TX-811-2025-12345".to_string(),
        source: "811".to_string(),
        status: TicketStatus::PermitFiled,
        excavator_name: "Fiber Connect Solutions".to_string(),
        excavator_phone: "(512) 555-0200".to_string(),
        excavator_email: Some("project@fiberconnect.com".to_string()),
        work_address: "123 Main Street, Austin, TX 78701".to_string(),
        latitude: 30.2672,
        longitude: -97.7431,
        utility_types: vec![UtilityType::Fiber, UtilityType::Electric],
        work_start_date: at("2025-03-01T00:00:00Z")?,
        work_end_date: at("2025-03-15T00:00:00Z")?,
        work_description: "Installation of fiber optic cable for residential internet service. \
                           Work includes trenching, conduit installation, and restoration."
            .to_string(),
        emergency_contact: Some("(512) 555-0300".to_string()),
        raw_data: json!({
            "originalTicket": "TX-811-2025-12345",
            "requestDate": "2025-02-15",
            "workType": "New Installation",
            "depth": "18 inches",
            "method": "Open Cut",
        }),
        created_at: at("2025-02-15T09:00:00Z")?,
        updated_at: at("2025-02-20T14:15:00Z")?,
    };
    store.insert_ticket(&fiber, None).await?;

    let permit = Permit {
        id: Uuid::new_v4(),
        ticket_id: fiber.id,
        organization_id: org,
        permit_number: Some("AUSTIN-2025-001".to_string()),
        municipality: "City of Austin".to_string(),
        permit_type: "Right-of-Way Excavation".to_string(),
        application_data: json!({
            "applicantName": "Fiber Connect Solutions",
            "workType": "Utility Installation",
            "trafficControlRequired": true,
            "restorationMethod": "Full Depth Replacement",
        }),
        prefilled_data: json!({
            "applicantName": fiber.excavator_name,
            "applicantPhone": fiber.excavator_phone,
            "workAddress": fiber.work_address,
            "workDescription": fiber.work_description,
            "estimatedCost": "$2,500",
            "municipality": "City of Austin",
            "permitType": "Right-of-Way Excavation",
        }),
        fee: Decimal::new(7500, 2),
        status: PermitStatus::Approved,
        submitted_at: Some(at("2025-02-20T00:00:00Z")?),
        approved_at: Some(at("2025-02-25T00:00:00Z")?),
        pdf_path: None,
        xml_path: None,
        created_at: at("2025-02-20T10:30:00Z")?,
        updated_at: at("2025-02-25T00:00:00Z")?,
    };
    store.insert_permit(&permit, None).await?;

    store
        .insert_traffic_plan(&TrafficPlan {
            id: Uuid::new_v4(),
            ticket_id: fiber.id,
            organization_id: org,
            template_id: "residential-street-v1".to_string(),
            template_name: "Residential Street Template".to_string(),
            generated_data: json!({
                "streetType": "Residential",
                "laneConfiguration": "2-lane",
                "trafficDevices": ["Cones", "Warning Signs", "Flaggers"],
                "workZoneLength": "200 feet",
            }),
            pdf_path: "/storage/traffic-plans/tx-811-2025-12345-traffic-plan.pdf".to_string(),
            created_at: at("2025-02-21T00:00:00Z")?,
            updated_at: at("2025-02-21T00:00:00Z")?,
        })
        .await?;

    store
        .insert_inspection(&Inspection {
            id: Uuid::new_v4(),
            ticket_id: fiber.id,
            permit_id: Some(permit.id),
            organization_id: org,
            inspection_type: "Pre-Construction".to_string(),
            scheduled_date: at("2025-03-01T00:00:00Z")?,
            scheduled_time: "10:00 AM".to_string(),
            inspector: "City Inspector John Smith".to_string(),
            inspector_contact: "(512) 974-1234".to_string(),
            status: InspectionStatus::Scheduled,
            notes: None,
            completed_at: None,
            calendar_event_id: Some("cal-event-12345".to_string()),
            created_at: at("2025-02-25T00:00:00Z")?,
            updated_at: at("2025-02-25T00:00:00Z")?,
        })
        .await?;

    store
        .insert_evidence(&Evidence {
            id: Uuid::new_v4(),
            ticket_id: fiber.id,
            organization_id: org,
            user_id: supervisor.id,
            evidence_type: EvidenceType::LocateProof,
            title: "Pre-work utility locates verification".to_string(),
            description: Some("Photo showing all utilities properly marked before excavation".to_string()),
            file_path: "/storage/evidence/locate-proof-001.jpg".to_string(),
            file_type: "image/jpeg".to_string(),
            file_size: 2_048_576,
            gps_latitude: Some(30.2672),
            gps_longitude: Some(-97.7431),
            captured_at: at("2025-02-28T00:00:00Z")?,
            created_at: at("2025-02-28T00:00:00Z")?,
        })
        .await?;

    store
        .insert_fee(&Fee {
            id: Uuid::new_v4(),
            ticket_id: fiber.id,
            organization_id: org,
            fee_type: "PERMIT_FEE".to_string(),
            description: "Right-of-Way Excavation Permit Fee".to_string(),
            amount: Decimal::new(7500, 2),
            due_date: at("2025-03-01T00:00:00Z")?,
            paid_date: Some(at("2025-02-28T00:00:00Z")?),
            paid_amount: Some(Decimal::new(7500, 2)),
            status: FeeStatus::Paid,
            reference_number: Some("PAY-AUSTIN-001".to_string()),
            created_at: at("2025-02-20T00:00:00Z")?,
            updated_at: at("2025-02-28T00:00:00Z")?,
        })
        .await?;

    let history = [
        (
            AuditAction::TicketCreated,
            EntityType::Ticket,
            fiber.id,
            None,
            json!({ "status": TicketStatus::Intake }),
            "2025-02-15T09:00:00Z",
        ),
        (
            AuditAction::PermitCreated,
            EntityType::Permit,
            permit.id,
            None,
            json!({ "permitNumber": permit.permit_number, "status": PermitStatus::Draft }),
            "2025-02-20T10:30:00Z",
        ),
        (
            AuditAction::StatusUpdated,
            EntityType::Ticket,
            fiber.id,
            Some(json!({ "status": TicketStatus::Intake })),
            json!({ "status": TicketStatus::PermitFiled }),
            "2025-02-20T14:15:00Z",
        ),
    ];
    for (action, entity_type, entity_id, previous_data, new_data, timestamp) in history {
        store
            .append_audit(&AuditLog {
                id: Uuid::new_v4(),
                ticket_id: Some(fiber.id),
                organization_id: org,
                user_id: Some(coordinator.id),
                action,
                entity_type,
                entity_id,
                previous_data,
                new_data,
                timestamp: at(timestamp)?,
                ip_address: None,
                user_agent: None,
            })
            .await?;
    }

    let water = Ticket {
        id: Uuid::new_v4(),
        organization_id: org,
        ticket_number: "TX-811-2025-12346".to_string(),
        source: "811".to_string(),
        status: TicketStatus::Intake,
        excavator_name: "Metro Water Services".to_string(),
        excavator_phone: "(512) 555-0400".to_string(),
        excavator_email: Some("dispatch@metrowater.com".to_string()),
        work_address: "456 Oak Avenue, Austin, TX 78702".to_string(),
        latitude: 30.2849,
        longitude: -97.7341,
        utility_types: vec![UtilityType::Water, UtilityType::Sewer],
        work_start_date: at("2025-03-10T00:00:00Z")?,
        work_end_date: at("2025-03-12T00:00:00Z")?,
        work_description: "Emergency water main repair due to leak detected during routine inspection."
            .to_string(),
        emergency_contact: Some("(512) 555-0401".to_string()),
        raw_data: json!({
            "originalTicket": "TX-811-2025-12346",
            "requestDate": "2025-02-18",
            "workType": "Emergency Repair",
            "priority": "High",
        }),
        created_at: at("2025-02-18T08:00:00Z")?,
        updated_at: at("2025-02-18T08:00:00Z")?,
    };
    store.insert_ticket(&water, None).await?;

    tracing::info!(
        "Seeded organization {} with tickets {} and {}",
        organization.code,
        fiber.ticket_number,
        water.ticket_number
    );

    Ok(DemoData {
        organization_id: org,
        coordinator_id: coordinator.id,
        supervisor_id: supervisor.id,
        manager_id: manager.id,
        fiber_ticket_id: fiber.id,
        water_ticket_id: water.id,
        permit_id: permit.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::database::{MemoryStore, TicketQuery};

    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn seeds_a_complete_example() {
        let store = MemoryStore::new();
        let demo = seed_demo_data(&store, TEST_COST).await.unwrap();
        let org = demo.organization_id;

        let page = store
            .list_tickets(org, &TicketQuery { status: None, offset: 0, limit: 10 })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        // Newest first: the water repair came in after the fiber install
        assert_eq!(page.items[0].id, demo.water_ticket_id);

        assert_eq!(store.list_permits(org, Some(demo.fiber_ticket_id)).await.unwrap().len(), 1);
        assert_eq!(store.list_audit_for_ticket(org, demo.fiber_ticket_id).await.unwrap().len(), 3);
        let manager = store.find_user_by_email(MANAGER_EMAIL).await.unwrap().unwrap();
        assert!(manager.password_hash.starts_with("$2b$04$"));
        assert!(verify_password(DEMO_PASSWORD, &manager.password_hash).unwrap());
    }

    #[tokio::test]
    async fn seeding_twice_conflicts() {
        let store = MemoryStore::new();
        seed_demo_data(&store, TEST_COST).await.unwrap();
        assert!(matches!(seed_demo_data(&store, TEST_COST).await, Err(StoreError::Conflict(_))));
    }
}
