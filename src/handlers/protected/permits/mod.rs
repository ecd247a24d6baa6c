// handlers/protected/permits/mod.rs - /api/permits
// Drafting from a ticket, application edits and mock portal submission.

pub mod list;
pub mod prefill;
pub mod show;
pub mod submit;
pub mod update;

pub use list::list_get;
pub use prefill::prefill_post;
pub use show::show_get;
pub use submit::submit_post;
pub use update::update_patch;
