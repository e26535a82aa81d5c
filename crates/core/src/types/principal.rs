//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

use super::{StoreId, StoreRole};

/// The verified identity of a caller, produced by the authentication gateway.
///
/// Mercato never authenticates callers itself. It trusts the store and role a
/// principal carries and uses them only to scope and authorize order
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Store the caller acts for.
    pub store_id: StoreId,
    /// Caller's role within that store.
    pub role: StoreRole,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub const fn new(store_id: StoreId, role: StoreRole) -> Self {
        Self { store_id, role }
    }

    /// Whether the principal may create orders and change their status.
    #[must_use]
    pub const fn can_manage_orders(&self) -> bool {
        self.role.can_manage_orders()
    }

    /// Whether a store id supplied alongside a request refers to this
    /// principal's own store. Absent ids are taken to mean "my store".
    #[must_use]
    pub fn owns(&self, claimed: Option<StoreId>) -> bool {
        claimed.is_none_or(|id| id == self.store_id)
    }
}
