//! Acting identity threaded through every engine call.

use serde::{Deserialize, Serialize};

use crate::id::{TenantId, UserId};

/// The tenant and user on whose behalf an operation runs.
///
/// Identity is always an explicit parameter, never ambient state; the engine
/// only performs the tenant-match guard and otherwise treats these as trusted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

impl Actor {
    pub fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self { tenant_id, user_id }
    }
}
