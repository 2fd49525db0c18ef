use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::update::{UpdatePlan, UpdateValue};

/// Columns safe to return to clients. The password hash is never selected.
pub const PUBLIC_COLUMNS: &str =
    "id, username, email, role, avatar_url, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub async fn list(db: &PgPool) -> Result<Vec<PublicUser>, sqlx::Error> {
    sqlx::query_as::<_, PublicUser>(&format!(
        "SELECT {} FROM users ORDER BY id",
        PUBLIC_COLUMNS
    ))
    .fetch_all(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<PublicUser>, sqlx::Error> {
    sqlx::query_as::<_, PublicUser>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PUBLIC_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Advisory uniqueness pre-check: is this email held by any *other* user?
/// Raced writes are caught by the unique constraint at update time.
pub async fn email_taken_by_other(
    db: &PgPool,
    email: &str,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id != $2")
            .bind(email)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

// Column names come from the fixed whitelist in the plan builder; only
// values travel as bind parameters.
fn update_sql(columns: &[&'static str]) -> String {
    let mut sql = String::from("UPDATE users SET ");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(column);
        sql.push_str(&format!(" = ${}", i + 1));
    }
    sql.push_str(&format!(
        " WHERE id = ${} RETURNING {}",
        columns.len() + 1,
        PUBLIC_COLUMNS
    ));
    sql
}

/// Applies a validated update plan as a single parameterized statement.
/// Returns `None` when the target row does not exist.
pub async fn execute_update(
    db: &PgPool,
    plan: UpdatePlan,
) -> Result<Option<PublicUser>, sqlx::Error> {
    let UpdatePlan {
        target_id,
        assignments,
    } = plan;

    let columns: Vec<&'static str> = assignments.iter().map(|(c, _)| *c).collect();
    let sql = update_sql(&columns);
    let mut query = sqlx::query_as::<_, PublicUser>(&sql);
    for (_, value) in assignments {
        query = match value {
            UpdateValue::Text(v) => query.bind(v),
            UpdateValue::Role(v) => query.bind(v),
            UpdateValue::Timestamp(v) => query.bind(v),
        };
    }
    query.bind(target_id).fetch_optional(db).await
}

pub async fn delete(db: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(id,)| id))
}

/// Self-service avatar write: url plus updated_at, one statement.
pub async fn set_avatar(
    db: &PgPool,
    user_id: i64,
    url: &str,
) -> Result<Option<(String, OffsetDateTime)>, sqlx::Error> {
    sqlx::query_as::<_, (String, OffsetDateTime)>(
        "UPDATE users SET avatar_url = $1, updated_at = now() \
         WHERE id = $2 RETURNING avatar_url, updated_at",
    )
    .bind(url)
    .bind(user_id)
    .fetch_optional(db)
    .await
}
