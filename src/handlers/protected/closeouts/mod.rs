// handlers/protected/closeouts/mod.rs - /api/closeouts

pub mod list;
pub mod submit;

pub use list::list_get;
pub use submit::submit_post;
