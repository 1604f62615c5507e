//! Input validation for account registration and profile updates.

use thiserror::Error;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 4;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Minimum length accepted by the registration password policy.
pub const MIN_POLICY_PASSWORD_LENGTH: usize = 6;

/// Maximum full name length.
pub const MAX_FULL_NAME_LENGTH: usize = 150;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters")]
    UsernameLength,

    #[error("username must start with a letter")]
    UsernameMustStartWithLetter,

    #[error("username can only contain letters and digits")]
    UsernameInvalidChars,

    #[error("password must be at least {MIN_POLICY_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("password must contain at least one uppercase letter")]
    PasswordMissingUppercase,

    #[error("password must contain at least one digit")]
    PasswordMissingDigit,

    #[error("password must contain at least one symbol")]
    PasswordMissingSymbol,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("full name must be at most {MAX_FULL_NAME_LENGTH} characters")]
    FullNameTooLong,

    #[error("full name contains invalid characters")]
    FullNameInvalidChars,

    #[error("email is required")]
    EmailEmpty,

    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    #[error("invalid email format")]
    EmailInvalidFormat,
}

impl ValidationError {
    /// The request field this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::UsernameLength | Self::UsernameMustStartWithLetter | Self::UsernameInvalidChars => {
                "username"
            }
            Self::PasswordTooShort
            | Self::PasswordMissingUppercase
            | Self::PasswordMissingDigit
            | Self::PasswordMissingSymbol => "password",
            Self::PasswordMismatch => "password2",
            Self::FullNameTooLong | Self::FullNameInvalidChars => "full_name",
            Self::EmailEmpty | Self::EmailTooLong | Self::EmailInvalidFormat => "email",
        }
    }
}

/// Validate a username.
///
/// Must match `^[A-Za-z][A-Za-z0-9]{3,19}$`.
///
/// # Examples
///
/// ```
/// use nimbus::auth::validation::validate_username;
///
/// assert!(validate_username("alice1").is_ok());
/// assert!(validate_username("1alice").is_err());
/// assert!(validate_username("al").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }

    let mut chars = username.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::UsernameMustStartWithLetter);
    }
    if !chars.all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::UsernameInvalidChars);
    }

    Ok(())
}

/// Check the registration password policy: a minimum length plus at least
/// one uppercase letter, one digit, and one non-alphanumeric character.
///
/// The general strength check in [`crate::auth::validate_password`] is
/// applied separately.
pub fn validate_password_policy(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_POLICY_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::PasswordMissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasswordMissingDigit);
    }
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Err(ValidationError::PasswordMissingSymbol);
    }
    Ok(())
}

/// Validate a display name. Empty is allowed.
pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::FullNameTooLong);
    }
    if full_name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::FullNameInvalidChars);
    }
    Ok(())
}

/// Validate an email address (required).
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if email.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ValidationError::EmailInvalidFormat);
    }
    if domain.split('.').any(|p| p.is_empty()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Normalize an email address for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate all registration fields at once.
///
/// Returns the first validation error encountered.
pub fn validate_registration(
    username: &str,
    email: &str,
    full_name: &str,
    password: &str,
    password2: &str,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_full_name(full_name)?;
    validate_password_policy(password)?;
    if password != password2 {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
