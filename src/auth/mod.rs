//! Identity store for Nimbus.
//!
//! Password hashing, registration, credential checks, profile edits, and
//! the admin operations on accounts.

mod admin;
mod login;
mod password;
mod profile;
mod registration;
pub mod validation;

pub use admin::{list_accounts, set_admin};
pub use login::{authenticate, INVALID_CREDENTIALS};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use profile::{get_profile, update_profile, ProfileError, ProfileUpdateRequest};
pub use registration::{register, register_admin, RegistrationError, RegistrationRequest};
pub use validation::ValidationError;
