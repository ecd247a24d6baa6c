// Organization-wide workload counters.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::ServiceResult;
use crate::database::models::{FeeStatus, PermitStatus, TicketStatus};
use crate::database::{Store, TicketQuery};

const RECENT_TICKETS: u64 = 10;

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn summary(&self, organization_id: Uuid) -> ServiceResult<Value> {
        let store = &self.store;
        let now = Utc::now();

        let tickets_pending = store.count_tickets(organization_id, TicketStatus::PENDING).await?;
        let permits_awaiting = store
            .count_permits(organization_id, PermitStatus::PendingApproval)
            .await?;
        let inspections_upcoming = store.count_upcoming_inspections(organization_id, now).await?;
        let fees_outstanding = store.count_fees(organization_id, FeeStatus::Outstanding).await?;

        let recent = store
            .list_tickets(
                organization_id,
                &TicketQuery {
                    status: None,
                    offset: 0,
                    limit: RECENT_TICKETS,
                },
            )
            .await?
            .items;

        let mut permit_statuses: HashMap<Uuid, Vec<Value>> = HashMap::new();
        for p in store.list_permits(organization_id, None).await? {
            permit_statuses
                .entry(p.ticket_id)
                .or_default()
                .push(json!({ "status": p.status }));
        }
        let mut inspection_statuses: HashMap<Uuid, Vec<Value>> = HashMap::new();
        for i in store.list_inspections(organization_id, None).await? {
            inspection_statuses
                .entry(i.ticket_id)
                .or_default()
                .push(json!({ "status": i.status }));
        }

        let recent_tickets: Vec<Value> = recent
            .into_iter()
            .map(|ticket| {
                let id = ticket.id;
                let mut value = json!(ticket);
                value["permits"] = json!(permit_statuses.remove(&id).unwrap_or_default());
                value["inspections"] = json!(inspection_statuses.remove(&id).unwrap_or_default());
                value
            })
            .collect();

        Ok(json!({
            "ticketsPending": tickets_pending,
            "permitsAwaitingApproval": permits_awaiting,
            "inspectionsUpcoming": inspections_upcoming,
            "feesOutstanding": fees_outstanding,
            "recentTickets": recent_tickets,
        }))
    }
}
