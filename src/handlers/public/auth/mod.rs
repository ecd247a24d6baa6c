// handlers/public/auth/mod.rs - token acquisition

pub mod login;
pub mod utils;

pub use login::login_post;
