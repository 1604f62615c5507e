//! API handlers.

pub mod admin;
pub mod auth;
pub mod download;
pub mod file;
pub mod profile;

pub use auth::{login, logout, me, refresh, register, AppState};
pub use download::download_by_token;
pub use profile::{delete_profile, get_profile, update_profile};
