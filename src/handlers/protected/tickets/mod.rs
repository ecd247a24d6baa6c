// handlers/protected/tickets/mod.rs - /api/tickets
// 811 intake, listing, status changes and the dashboard counters.

pub mod dashboard;
pub mod import;
pub mod list;
pub mod prefill_permit;
pub mod show;
pub mod status;
pub mod utils;

pub use dashboard::dashboard_get;
pub use import::import_post;
pub use list::list_get;
pub use prefill_permit::prefill_permit_post;
pub use show::show_get;
pub use status::status_patch;
