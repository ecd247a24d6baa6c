// handlers/protected/traffic_plans/mod.rs - /api/traffic-plans

pub mod generate;
pub mod list;

pub use generate::generate_post;
pub use list::list_get;
