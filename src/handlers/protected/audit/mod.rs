// handlers/protected/audit/mod.rs - /api/audit
// Read side of the append-only trail: per-ticket history, compliance export, organization summary.

pub mod export;
pub mod summary;
pub mod trail;

pub use export::export_get;
pub use summary::summary_get;
pub use trail::trail_get;
