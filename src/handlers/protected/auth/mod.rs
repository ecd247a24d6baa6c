// handlers/protected/auth/mod.rs - account management for signed-in users

pub mod me;
pub mod password;
pub mod register;

pub use me::me_get;
pub use password::password_patch;
pub use register::register_post;
