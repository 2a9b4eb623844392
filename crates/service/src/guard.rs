//! Access-Scoped Mutation Guard.

use uuid::Uuid;

use models::user::Role;

use crate::errors::{ServiceError, ServiceResult};

/// The authenticated actor of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fail unless the principal holds one of `allowed`.
pub fn ensure_role(principal: &Principal, allowed: &[Role]) -> ServiceResult<()> {
    if allowed.contains(&principal.role) {
        return Ok(());
    }
    Err(ServiceError::Unauthorized(format!(
        "User role {} is not authorized to access this route",
        principal.role.as_str()
    )))
}

/// Owner or admin may mutate; everyone else is refused.
pub fn ensure_can_mutate(principal: &Principal, owner_id: Uuid, action: &str) -> ServiceResult<()> {
    if principal.id == owner_id || principal.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::unauthorized(principal.id, action))
    }
}
