//! Request-scoped caller identity.

use serde::{Deserialize, Serialize};

use clinic_stock_core::StaffRole;

/// Who is making a request and with which privileges.
///
/// Authentication happens in front of this service; callers pass the
/// already-verified identity into every operation that records or changes
/// ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Identity recorded as the actor on ledger entries (usually an email).
    pub actor: String,
    /// Privilege level.
    pub role: StaffRole,
}

impl RequestContext {
    /// Create a context for the given actor and role.
    #[must_use]
    pub fn new(actor: impl Into<String>, role: StaffRole) -> Self {
        Self {
            actor: actor.into(),
            role,
        }
    }

    /// Create a context with staff privileges.
    #[must_use]
    pub fn staff(actor: impl Into<String>) -> Self {
        Self::new(actor, StaffRole::Staff)
    }

    /// Create a context with admin privileges.
    #[must_use]
    pub fn admin(actor: impl Into<String>) -> Self {
        Self::new(actor, StaffRole::Admin)
    }

    /// Whether the caller has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }

    /// Whether the caller may edit or delete an entry recorded by `owner`.
    #[must_use]
    pub fn can_modify(&self, owner: &str) -> bool {
        self.is_admin() || self.actor == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_can_modify_own_entries_only() {
        let ctx = RequestContext::staff("nurse@clinic.test");
        assert!(ctx.can_modify("nurse@clinic.test"));
        assert!(!ctx.can_modify("pharmacist@clinic.test"));
    }

    #[test]
    fn test_admin_can_modify_any_entry() {
        let ctx = RequestContext::admin("head@clinic.test");
        assert!(ctx.is_admin());
        assert!(ctx.can_modify("nurse@clinic.test"));
    }
}
