// handlers/protected/mod.rs - handlers behind the JWT middleware
//
// Every handler here receives the verified caller as `AuthUser` and checks its
// role guard before touching the store. All reads and writes are scoped to the
// caller's organization.

pub mod audit;
pub mod auth;
pub mod closeouts;
pub mod evidence;
pub mod inspections;
pub mod permits;
pub mod tickets;
pub mod traffic_plans;
pub mod utils;
