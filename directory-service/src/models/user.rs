use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Role claim stored in the identity provider's user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn level(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Admin => 2,
            Role::SuperAdmin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Interpret a raw preference value. A missing claim means `user`;
    /// an unrecognised one yields `None`.
    pub fn from_claim(claim: Option<&str>) -> Option<Role> {
        match claim.map(|c| c.trim().to_lowercase()) {
            None => Some(Role::User),
            Some(c) => match c.as_str() {
                "" | "user" => Some(Role::User),
                "admin" => Some(Role::Admin),
                "super_admin" | "superadmin" => Some(Role::SuperAdmin),
                _ => None,
            },
        }
    }

    pub fn satisfies(self, required: Role) -> bool {
        self.level() >= required.level()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller behind a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<Role>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, required: Role) -> bool {
        self.role.map_or(false, |role| role.satisfies(required))
    }
}
