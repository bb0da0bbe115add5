use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::identity::{derive_id, RecordId};

/// A user row. `id` is never stored; it is derived from `email` on every load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        Self { id: derive_id(email.trim()), name: name.into(), email }
    }

    /// Case-insensitive email comparison used for the uniqueness check.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

/// Basic `local@domain.tld` shape: no whitespace, exactly one `@`, and a dot
/// inside the domain part with at least one character on each side.
pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let invalid = || ModelError::invalid("Invalid email format");
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let inner = domain.char_indices().skip(1).any(|(i, c)| c == '.' && i + 1 < domain.len());
    if !inner {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::invalid("name must not be blank"));
    }
    Ok(())
}

/// Create payload. Fields are optional so that a missing field is a
/// validation error rather than a body rejection.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl NewUser {
    /// Check required fields and email shape; returns the trimmed user.
    pub fn validate(&self) -> Result<User, ModelError> {
        let (name, email) = match (non_blank(&self.name), non_blank(&self.email)) {
            (Some(name), Some(email)) => (name, email),
            _ => return Err(ModelError::invalid("Name and email are required")),
        };
        validate_email(email)?;
        Ok(User::new(name, email))
    }
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.is_none() && self.email.is_none() {
            return Err(ModelError::invalid("At least one field (name or email) is required"));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email.trim())?;
        }
        Ok(())
    }

    /// Validate, then apply to `user`. A changed email changes the derived id.
    pub fn apply(&self, user: &mut User) -> Result<(), ModelError> {
        self.validate()?;
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = email.trim().to_string();
            user.id = derive_id(&user.email);
        }
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
