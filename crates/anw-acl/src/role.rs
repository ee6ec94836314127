//! The closed role vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Effective role for one access decision.
///
/// `Public` is the anonymous sentinel; it is never assigned to a signed-in
/// user. Ordering follows privilege, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Anonymous visitor.
    Public,
    /// Signed-in member; the least-privilege default.
    Resident,
    /// Street volunteer.
    Volunteer,
    /// Area coordinator.
    Coordinator,
    /// Site administrator.
    Admin,
    /// Site owner; bypasses every role list.
    Owner,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 6] = [
        Role::Public,
        Role::Resident,
        Role::Volunteer,
        Role::Coordinator,
        Role::Admin,
        Role::Owner,
    ];

    /// Lower-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::Resident => "resident",
            Role::Volunteer => "volunteer",
            Role::Coordinator => "coordinator",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Parse a role name case-insensitively. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Role> {
        let name = name.trim().to_lowercase();
        Role::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// Admin or owner.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| Error::validation(format!("unknown role '{}'", s.trim())))
    }
}
