//! User Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access role, ordered by privilege (`User < Librarian < Admin`)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Librarian,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Librarian, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }

    /// Decode a stored role. Anything unrecognised is the least privileged role.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(Role::User)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse used for admin input; stored values go through [`Role::from_db`]
impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "librarian" => Ok(Role::Librarian),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::from_db(&value)
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub role: Role,
    pub created_at: i64,
}

/// Registration payload (role and createdAt are server-assigned)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// Admin role change payload; validated with [`Role::from_str`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub role: String,
}

/// Caller's own identity as seen by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub role: Role,
}
