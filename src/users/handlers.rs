use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::CurrentUser,
    error::AppError,
    state::AppState,
    users::{
        dto::{AvatarResponse, DeleteUserResponse, UpdateUserRequest, UpdateUserResponse},
        policy, repo,
        update::build_update,
    },
};

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<repo::PublicUser>>, AppError> {
    let users = repo::list(&state.db).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<repo::PublicUser>, AppError> {
    policy::check(caller, id, None)?;
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, AppError> {
    policy::check(caller, id, payload.role)?;

    let plan = build_update(&state.db, id, caller.role, payload).await?;
    let user = repo::execute_update(&state.db, plan)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    info!(user_id = id, "user updated");
    Ok(Json(UpdateUserResponse {
        message: "User updated successfully",
        user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    policy::check(caller, id, None)?;
    let user_id = repo::delete(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    info!(user_id, "user deleted");
    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully",
        user_id,
    }))
}

/// Always self-service: the avatar lands on the caller's own row, never on
/// behalf of another user.
#[instrument(skip(state, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    mut mp: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let mut file: Option<(bytes::Bytes, String)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Unreadable file: {}", e)))?;
            file = Some((data, content_type));
            break;
        }
    }

    let Some((data, content_type)) = file.filter(|(data, _)| !data.is_empty()) else {
        warn!(user_id = caller.id, "avatar upload without file");
        return Err(AppError::validation("No file uploaded"));
    };

    // Deterministic key so repeated uploads overwrite instead of piling up.
    let key = format!("avatars/user-{}-avatar", caller.id);
    let url = state
        .media
        .upload(&key, data, &content_type)
        .await
        .map_err(AppError::Upload)?;

    let (url, updated_at) = repo::set_avatar(&state.db, caller.id, &url)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;

    info!(user_id = caller.id, "avatar uploaded");
    Ok(Json(AvatarResponse {
        message: "Avatar uploaded successfully",
        url,
        updated_at,
    }))
}
