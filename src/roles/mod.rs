//! Role vocabulary and the Role Store seam.
//!
//! Role names arrive as loose strings from the database and from callers.
//! They are mapped onto [`Role`] at the boundary through [`Role::as_str`], so an
//! unknown name fails when a [`RoleSet`] is built instead of silently
//! resolving to "not held" deep inside a query.

pub mod resolver;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::identity::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "leader")]
    Leader,
    #[serde(rename = "volunteer")]
    Volunteer,
    /// Plain signed-up member; stored as `user`.
    #[serde(rename = "user")]
    Member,
}

/// Every role, in `app_role` enum order.
pub const ROLES: [Role; 4] = [Role::Admin, Role::Leader, Role::Volunteer, Role::Member];

impl Role {
    /// Label of the matching `app_role` value in Postgres.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Leader => "leader",
            Self::Volunteer => "volunteer",
            Self::Member => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ROLES
            .into_iter()
            .find(|role| role.as_str() == raw)
            .ok_or_else(|| UnknownRole(raw.to_owned()))
    }
}

// =============================================================================
// ROLE SET
// =============================================================================

/// Requested roles, kept sorted so equal requests share one cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Roles admitted to the administrative dashboard.
    #[must_use]
    pub fn team() -> Self {
        Self::new([Role::Admin, Role::Leader, Role::Volunteer])
    }

    #[must_use]
    pub fn only(role: Role) -> Self {
        Self::new([role])
    }

    /// Build a set from role names.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRole`] for the first name that is not a [`Role`] label.
    pub fn parse<I, S>(names: I) -> Result<Self, UnknownRole>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| name.as_ref().parse::<Role>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, role) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            f.write_str(role.as_str())?;
        }
        Ok(())
    }
}

// =============================================================================
// ROLE STORE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoleStoreError {
    #[error("role query failed: {0}")]
    Db(#[from] sqlx::Error),
    #[error("role store unavailable: {0}")]
    Unavailable(String),
}

/// Authorization collaborator, answering one `(actor, role)` pair at a time.
#[async_trait::async_trait]
pub trait RoleStore: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RoleStoreError`] on transport or query failure. The
    /// resolver counts that as "not held".
    async fn has_role(&self, actor: &ActorId, role: Role) -> Result<bool, RoleStoreError>;
}
