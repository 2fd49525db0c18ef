//! Partial-update planning for the `users` table.
//!
//! An update request carries an arbitrary subset of fields. Each present
//! field is validated, then recorded as an ordered `(column, value)` pair;
//! the plan is executed as one parameterized statement so the mutation is
//! all-or-nothing and values never reach the SQL text.

use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::users::dto::UpdateUserRequest;
use crate::users::repo::{self, Role};

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateValue {
    Text(String),
    Role(Role),
    Timestamp(OffsetDateTime),
}

/// Ordered, validated set of column assignments for one row.
#[derive(Debug)]
pub struct UpdatePlan {
    pub target_id: i64,
    pub assignments: Vec<(&'static str, UpdateValue)>,
}

impl UpdatePlan {
    fn new(target_id: i64) -> Self {
        Self {
            target_id,
            assignments: Vec::new(),
        }
    }

    fn set(&mut self, column: &'static str, value: UpdateValue) {
        self.assignments.push((column, value));
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.assignments.iter().map(|(c, _)| *c).collect()
    }

    pub fn email(&self) -> Option<&str> {
        self.assignments.iter().find_map(|(c, v)| match (c, v) {
            (&"email", UpdateValue::Text(e)) => Some(e.as_str()),
            _ => None,
        })
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Length >= 8 plus at least one uppercase, lowercase, digit and symbol.
fn check_password_strength(password: &str) -> Result<(), AppError> {
    let long_enough = password.chars().count() >= 8;
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let symbol = password.chars().any(|c| !c.is_alphanumeric());
    if long_enough && upper && lower && digit && symbol {
        Ok(())
    } else {
        Err(AppError::validation(
            "Password must be at least 8 characters long and include \
             uppercase, lowercase, number, and special character.",
        ))
    }
}

// Empty strings count as absent, matching form-style clients that send
// every key.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Pure planning step: per-field validation, password hashing, role gating,
/// `updated_at` stamping. The email-uniqueness pre-check is storage-bound
/// and lives in [`build_update`].
pub fn plan_update(
    target_id: i64,
    caller_role: Role,
    req: UpdateUserRequest,
) -> Result<UpdatePlan, AppError> {
    let mut plan = UpdatePlan::new(target_id);

    if let Some(username) = non_empty(req.username) {
        plan.set("username", UpdateValue::Text(username));
    }

    if let Some(email) = non_empty(req.email) {
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email format"));
        }
        plan.set("email", UpdateValue::Text(email));
    }

    if let Some(password) = non_empty(req.password) {
        check_password_strength(&password)?;
        let hash = hash_password(&password)?;
        plan.set("password", UpdateValue::Text(hash));
    }

    // The route guard already rejects non-admin role changes; this defends
    // the builder when invoked directly.
    match (req.role, caller_role) {
        (Some(role), Role::Admin) => plan.set("role", UpdateValue::Role(role)),
        (Some(_), _) => {
            return Err(AppError::Forbidden(
                "Forbidden: Only admins can change user roles",
            ))
        }
        (None, _) => {}
    }

    if plan.assignments.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }
    plan.set(
        "updated_at",
        UpdateValue::Timestamp(OffsetDateTime::now_utc()),
    );
    Ok(plan)
}

/// Full build: pure planning, then the advisory email-uniqueness pre-check
/// right before the caller executes the plan. The pre-check can race a
/// concurrent writer; the unique constraint is the backstop.
pub async fn build_update(
    db: &PgPool,
    target_id: i64,
    caller_role: Role,
    req: UpdateUserRequest,
) -> Result<UpdatePlan, AppError> {
    let plan = plan_update(target_id, caller_role, req)?;
    if let Some(email) = plan.email() {
        if repo::email_taken_by_other(db, email, target_id).await? {
            return Err(AppError::conflict("Email already in use by another user."));
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    fn req(
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
        role: Option<Role>,
    ) -> UpdateUserRequest {
        UpdateUserRequest {
            username: username.map(String::from),
            email: email.map(String::from),
            password: password.map(String::from),
            role,
        }
    }

    #[test]
    fn empty_request_is_rejected() {
        let err = plan_update(5, Role::User, req(None, None, None, None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let err =
            plan_update(5, Role::User, req(Some(""), Some(""), Some(""), None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn username_only_plan_touches_username_and_updated_at() {
        let plan = plan_update(5, Role::User, req(Some("bob"), None, None, None)).unwrap();
        assert_eq!(plan.target_id, 5);
        assert_eq!(plan.columns(), vec!["username", "updated_at"]);
        assert_eq!(
            plan.assignments[0].1,
            UpdateValue::Text("bob".to_string())
        );
    }

    #[test]
    fn updated_at_is_always_last() {
        let plan = plan_update(
            5,
            Role::Admin,
            req(Some("bob"), Some("bob@example.com"), None, Some(Role::Admin)),
        )
        .unwrap();
        assert_eq!(
            plan.columns(),
            vec!["username", "email", "role", "updated_at"]
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in [
            "plainaddress",
            "missing-at.example.com",
            "two@@example.com",
            "no-tld@example",
            "spaces in@example.com",
            "@example.com",
            "user@.com ",
        ] {
            let err = plan_update(5, Role::User, req(None, Some(email), None, None))
                .expect_err(email);
            assert!(matches!(err, AppError::Validation(_)), "{}", email);
        }
    }

    #[test]
    fn well_formed_email_is_planned() {
        let plan =
            plan_update(5, Role::User, req(None, Some("a@b.co"), None, None)).unwrap();
        assert_eq!(plan.email(), Some("a@b.co"));
    }

    #[test]
    fn weak_passwords_are_rejected() {
        for password in [
            "Ab1!",        // too short
            "lower1!aa",   // no uppercase
            "UPPER1!AA",   // no lowercase
            "Password!!",  // no digit
            "Password11",  // no symbol
        ] {
            let err = plan_update(5, Role::User, req(None, None, Some(password), None))
                .expect_err(password);
            assert!(matches!(err, AppError::Validation(_)), "{}", password);
        }
    }

    #[test]
    fn strong_password_is_hashed_not_stored_raw() {
        let plan =
            plan_update(5, Role::User, req(None, None, Some("Str0ng!pass"), None)).unwrap();
        let (column, value) = &plan.assignments[0];
        assert_eq!(*column, "password");
        let UpdateValue::Text(stored) = value else {
            panic!("password must be a text assignment");
        };
        assert_ne!(stored, "Str0ng!pass");
        assert!(!stored.contains("Str0ng!pass"));
        assert!(verify_password("Str0ng!pass", stored).unwrap());
    }

    #[test]
    fn role_change_requires_admin_even_here() {
        let err = plan_update(5, Role::User, req(None, None, None, Some(Role::Admin)))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn admin_role_change_is_planned() {
        let plan =
            plan_update(5, Role::Admin, req(None, None, None, Some(Role::Admin))).unwrap();
        assert_eq!(plan.columns(), vec!["role", "updated_at"]);
        assert_eq!(plan.assignments[0].1, UpdateValue::Role(Role::Admin));
    }
}
