// handlers/protected/inspections/mod.rs - /api/inspections

pub mod list;
pub mod schedule;

pub use list::list_get;
pub use schedule::schedule_post;
