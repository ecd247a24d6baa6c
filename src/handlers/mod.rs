// handlers/mod.rs - route handlers by security tier
//
// Public (no auth) -> Protected (JWT, role guard per route) -> Elevated (compliance managers,
// outside /api). Each route lives in its own file under the area it serves.

pub mod elevated;
pub mod protected;
pub mod public;
