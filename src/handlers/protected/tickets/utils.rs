// handlers/protected/tickets/utils.rs - query parsing shared by the ticket listings

use crate::error::ApiError;

/// Resolved paging window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u64,
    pub limit: u64,
}

impl Paging {
    /// Page defaults to 1; limit defaults to `default_limit` and must fall within `1..=max_limit`
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<Self, ApiError> {
        let page = match page {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid page '{}'", raw)))?,
        };
        let max_limit = max_limit.max(1);
        let limit = match limit {
            None => default_limit.clamp(1, max_limit),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|l| (1..=max_limit).contains(l))
                .ok_or_else(|| {
                    ApiError::bad_request(format!("Invalid limit '{}', expected 1 to {}", raw, max_limit))
                })?,
        };
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}
