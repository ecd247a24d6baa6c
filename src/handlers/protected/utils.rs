// handlers/protected/utils.rs - query parsing shared by the field record listings

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::parse_uuid;

/// Optional `?ticketId=` narrowing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilter {
    pub ticket_id: Option<String>,
}

impl TicketFilter {
    pub fn ticket_id(&self) -> Result<Option<Uuid>, ApiError> {
        self.ticket_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_uuid(s, "ticket id"))
            .transpose()
    }
}
