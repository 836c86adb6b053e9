use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored account row.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public projection; never carries the hash.
    #[must_use]
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            updated_at: self.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginUser {
    pub email: String,
    #[schema(value_type = String, format = Password)]
    pub password: SecretString,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: String,
    pub email: String,
    #[serde(alias = "currentemail")]
    pub current_email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePassword {
    #[serde(alias = "currentpassword")]
    #[schema(value_type = String, format = Password)]
    pub current_password: SecretString,
    #[serde(alias = "newpassword")]
    #[schema(value_type = String, format = Password)]
    pub new_password: SecretString,
}

/// Result of a successful login or profile update.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserResponse,
    pub token: String,
}
