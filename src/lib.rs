pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod seed;
pub mod services;

pub use app::{build_router, AppState};
