// handlers/elevated/mod.rs - operator views outside /api
//
// Still behind the JWT middleware, but limited to compliance managers and
// scoped to their organization's jobs.

pub mod queues;
