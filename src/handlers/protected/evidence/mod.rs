// handlers/protected/evidence/mod.rs - /api/evidence

pub mod list;

pub use list::list_get;
