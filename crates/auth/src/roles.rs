use serde::{Deserialize, Serialize};

/// Identity class carried by a session.
///
/// The wire form is the upper-case name (`"TENANT_ADMIN"`, `"SUPER_ADMIN"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Staff user scoped to exactly one tenant.
    TenantAdmin,
    /// Platform operator, not scoped to any tenant.
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::TenantAdmin => "TENANT_ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
