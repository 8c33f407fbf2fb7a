use std::fmt;
use std::str::FromStr;

use crate::domain::role::errors::RoleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(pub i64);

/// The closed set of role names.
///
/// Parsing is exact-match: `"Admin"` or `" admin"` are not roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleName {
    User,
    Moderator,
    Admin,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::User => "user",
            RoleName::Moderator => "moderator",
            RoleName::Admin => "admin",
        }
    }
}

impl FromStr for RoleName {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(RoleName::User),
            "moderator" => Ok(RoleName::Moderator),
            "admin" => Ok(RoleName::Admin),
            other => Err(RoleError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role and its precedence level. Higher levels are more privileged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub description: String,
    pub level: i64,
}

impl Role {
    pub fn outranks_or_equals(&self, other: &Role) -> bool {
        self.level >= other.level
    }
}
