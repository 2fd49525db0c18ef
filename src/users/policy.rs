use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::users::repo::Role;

/// Owner-or-admin access decision. Pure; runs before any existence check so
/// a forbidden request never learns whether the target exists.
///
/// A requested `role` change is additionally admin-only, regardless of
/// ownership of the target record.
pub fn check(
    caller: CallerIdentity,
    target_id: i64,
    requested_role_change: Option<Role>,
) -> Result<(), AppError> {
    if caller.id != target_id && caller.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Forbidden: You can only access your own profile or you are not an admin",
        ));
    }
    if requested_role_change.is_some() && caller.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Forbidden: Only admins can change user roles",
        ));
    }
    Ok(())
}
