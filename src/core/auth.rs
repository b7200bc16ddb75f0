//! Caller identity and role checks.
//!
//! The HTTP layer verifies the session token and builds an [`AuthContext`]
//! from the `users` table; core operations only ever see that context.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use serde::Serialize;
use std::str::FromStr;

/// Platform roles. A user may hold several.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Program administrator
    Admin,
    /// Student
    Thalibah,
    /// Supervisor
    Musyrifah,
    /// Teacher
    Muallimah,
}

impl Role {
    /// Stored name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Thalibah => "thalibah",
            Self::Musyrifah => "musyrifah",
            Self::Muallimah => "muallimah",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "admin" => Ok(Self::Admin),
            "thalibah" => Ok(Self::Thalibah),
            "musyrifah" => Ok(Self::Musyrifah),
            "muallimah" => Ok(Self::Muallimah),
            other => Err(Error::validation(format!("Unknown role: {other}"))),
        }
    }
}

/// Parses a comma-separated role list, skipping entries it does not know.
#[must_use]
pub fn parse_roles(raw: &str) -> Vec<Role> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// The authenticated caller of an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    /// Identity-provider subject
    pub user_id: String,
    /// Roles held by the caller
    pub roles: Vec<Role>,
}

impl AuthContext {
    /// Creates a context for `user_id` holding `roles`.
    pub fn new(user_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    /// Whether the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the caller is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Fails with [`Error::Forbidden`] unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("Admin access required"))
        }
    }

    /// Fails with [`Error::Forbidden`] unless the caller is `user_id` or an
    /// administrator.
    pub fn require_self_or_admin(&self, user_id: &str) -> Result<()> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(Error::forbidden("Cannot act on behalf of another user"))
        }
    }
}

/// Builds the caller's context from the `users` table. Callers without a
/// profile row get no roles.
pub async fn load_auth_context<C>(db: &C, user_id: &str) -> Result<AuthContext>
where
    C: ConnectionTrait,
{
    let roles = User::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .map(|u| parse_roles(&u.roles))
        .unwrap_or_default();
    Ok(AuthContext::new(user_id, roles))
}

/// Inserts a user profile row.
pub async fn create_user(
    db: &DatabaseConnection,
    user_id: &str,
    full_name: &str,
    roles: &[Role],
) -> Result<user::Model> {
    if user_id.trim().is_empty() {
        return Err(Error::validation("user id is required"));
    }
    let roles = roles
        .iter()
        .copied()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",");

    let model = user::ActiveModel {
        id: Set(user_id.to_string()),
        full_name: Set(full_name.to_string()),
        roles: Set(roles),
        created_at: Set(Utc::now()),
    };
    model.insert(db).await.map_err(Into::into)
}
