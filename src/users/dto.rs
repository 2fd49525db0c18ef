use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::users::repo::{PublicUser, Role};

/// Sparse update body: absent fields are left untouched in storage.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub message: &'static str,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub message: &'static str,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_tolerates_sparse_bodies() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(req.username.as_deref(), Some("bob"));
        assert!(req.email.is_none());
        assert!(req.password.is_none());
        assert!(req.role.is_none());
    }

    #[test]
    fn role_parses_lowercase() {
        let req: UpdateUserRequest = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(req.role, Some(Role::Admin));
    }

    #[test]
    fn public_user_never_serializes_a_password() {
        let user = PublicUser {
            id: 5,
            username: "bob".into(),
            email: "bob@example.com".into(),
            role: Role::User,
            avatar_url: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("bob@example.com"));
        assert!(!json.contains("password"));
    }
}
