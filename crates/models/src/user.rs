use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ModelError, Violations};
use crate::validate::{is_email, non_blank};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(ModelError::invalid(format!("`{other}` is not a valid role"))),
        }
    }
}

/// Account record. Password material lives in [`Credentials`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Client-writable user fields; `password` is only honoured on create.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

impl UserInput {
    pub fn parse_role(&self) -> Result<Option<Role>, ModelError> {
        non_blank(self.role.as_deref()).map(str::parse::<Role>).transpose()
    }
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if non_blank(Some(email)).is_none() {
        return Err(ModelError::invalid("Please add an email"));
    }
    if !is_email(email) {
        return Err(ModelError::invalid("Please add a valid email"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if non_blank(Some(name)).is_none() {
        return Err(ModelError::invalid("Please add a name"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ModelError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ModelError::invalid(format!("Password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    Ok(())
}

impl User {
    /// Build a user from registration input; role defaults to `user`.
    pub fn create(input: &UserInput) -> Result<Self, ModelError> {
        let mut v = Violations::new();
        let name = input.name.as_deref().unwrap_or_default();
        let email = input.email.as_deref().unwrap_or_default();
        if let Err(ModelError::Validation(m)) = validate_name(name) { m.into_iter().for_each(|s| v.push(s)); }
        if let Err(ModelError::Validation(m)) = validate_email(email) { m.into_iter().for_each(|s| v.push(s)); }
        match input.password.as_deref() {
            None => v.push("Please enter a password"),
            Some(p) => if let Err(ModelError::Validation(m)) = validate_password(p) { m.into_iter().for_each(|s| v.push(s)); },
        }
        let role = match input.parse_role() {
            Ok(role) => role.unwrap_or_default(),
            Err(ModelError::Validation(m)) => {
                m.into_iter().for_each(|s| v.push(s));
                Role::User
            }
            Err(e) => return Err(e),
        };
        v.into_result()?;
        Ok(User {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_ascii_lowercase(),
            role,
            created_at: Utc::now(),
        })
    }

    /// Apply name/email/role changes. Password changes go through credentials.
    pub fn apply(&mut self, patch: &UserInput) -> Result<(), ModelError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
            self.name = name.trim().to_string();
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
            self.email = email.trim().to_ascii_lowercase();
        }
        if let Some(role) = patch.parse_role()? {
            self.role = role;
        }
        Ok(())
    }
}

/// Hashed password for a user; stored under the user's id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> UserInput {
        UserInput {
            name: Some("Jane Doe".into()),
            email: Some("Jane@Example.com".into()),
            role: Some("publisher".into()),
            password: Some("123456".into()),
        }
    }

    #[test]
    fn create_normalizes_email() {
        let u = User::create(&input()).unwrap();
        assert_eq!(u.email, "jane@example.com");
        assert_eq!(u.role, Role::Publisher);
    }

    #[test]
    fn role_defaults_to_user() {
        let mut i = input();
        i.role = None;
        assert_eq!(User::create(&i).unwrap().role, Role::User);
    }

    #[test]
    fn all_violations_collected() {
        let i = UserInput { name: None, email: Some("bad".into()), role: Some("root".into()), password: Some("123".into()) };
        match User::create(&i).unwrap_err() {
            ModelError::Validation(msgs) => assert_eq!(msgs.len(), 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
