// handlers/elevated/queues/mod.rs - /admin/queues

pub mod counts;
pub mod job;

pub use counts::counts_get;
pub use job::job_get;
