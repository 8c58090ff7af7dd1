//! Role checks shared by the access gate and the handlers.
//!
//! Roles are normalised once when the principal is resolved, so every check
//! here compares enum values and never strings.

use biolink_types::Principal;

use crate::api::ApiError;

/// The resolved caller, attached to request extensions by the gate or by
/// [`crate::middleware::auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthContext(pub Principal);

/// Why a request may not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    /// No principal could be resolved.
    Unauthenticated,
    /// A principal was resolved but lacks the required role.
    Unauthorized,
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => ApiError::Unauthenticated,
            AccessDenied::Unauthorized => ApiError::Unauthorized,
        }
    }
}

/// Allows only `ADMIN` and `SUPER_ADMIN` principals.
pub fn require_admin(principal: Option<&Principal>) -> Result<&Principal, AccessDenied> {
    let principal = principal.ok_or(AccessDenied::Unauthenticated)?;
    if principal.role.is_admin() {
        Ok(principal)
    } else {
        Err(AccessDenied::Unauthorized)
    }
}

/// Allows the owner of `user_id`, or any administrator.
pub fn require_self_or_admin(principal: &Principal, user_id: &str) -> Result<(), AccessDenied> {
    if principal.id == user_id || principal.role.is_admin() {
        Ok(())
    } else {
        Err(AccessDenied::Unauthorized)
    }
}
