// handlers/public/mod.rs - handlers that run without a token
//
// Health checks for load balancers and the login that issues tokens.

pub mod auth;
pub mod health;
