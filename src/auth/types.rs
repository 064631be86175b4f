//! Authenticated principal.

use std::collections::BTreeSet;

use crate::jwt::AccessClaims;

/// Identity resolved from a valid access token.
///
/// Immutable once constructed; lives for one request, carried in the
/// request's extensions rather than any global context.
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
    pub roles: BTreeSet<String>,
    pub privileges: BTreeSet<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_privilege(&self, privilege: &str) -> bool {
        self.privileges.contains(privilege)
    }
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            subject: claims.sub,
            roles: claims.roles,
            privileges: claims.privileges,
        }
    }
}
