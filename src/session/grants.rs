use std::collections::BTreeSet;

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::models::role::Grant;
use crate::utils::utc_now;

pub async fn list_grants<'e, E: SqliteExecutor<'e>>(executor: E, user_id: i64) -> AppResult<Vec<Grant>> {
    let grants = sqlx::query_as::<_, Grant>(
        r#"
        SELECT up.id, up.usuario_id, up.perfil_id, p.nome AS perfil_nome, up.observacoes,
               up.concedido_por, up.ativo, up.data_concessao
        FROM usuario_perfil up
        INNER JOIN perfil p ON p.id = up.perfil_id
        WHERE up.usuario_id = ? AND up.ativo = 1
        ORDER BY up.perfil_id
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(grants)
}

/// Grants each role to the user. Roles already actively granted are left untouched.
///
/// Runs on the caller's connection so it can share a transaction with the
/// surrounding writes; nothing is committed here.
pub async fn grant_roles(
    conn: &mut SqliteConnection,
    granted_by: Option<i64>,
    user_id: i64,
    role_ids: &[i64],
    notes: Option<&str>,
) -> AppResult<Vec<Grant>> {
    let role_ids: BTreeSet<i64> = role_ids.iter().copied().collect();
    if role_ids.is_empty() {
        return Err(AppError::bad_request("at least one role is required"));
    }

    let user_exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM usuario WHERE id = ? AND ativo = 1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if user_exists == 0 {
        return Err(AppError::not_found("user not found"));
    }

    let now = utc_now();
    for role_id in &role_ids {
        let role_exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM perfil WHERE id = ? AND ativo = 1")
            .bind(role_id)
            .fetch_one(&mut *conn)
            .await?;
        if role_exists == 0 {
            return Err(AppError::not_found(format!("role {role_id} not found")));
        }

        // The partial unique index turns a second active grant into a no-op.
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO usuario_perfil (usuario_id, perfil_id, concedido_por, observacoes, ativo, data_concessao) VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(user_id)
        .bind(role_id)
        .bind(granted_by)
        .bind(notes)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!(user_id, role_id, granted_by, "role granted");
        }
    }

    list_grants(&mut *conn, user_id).await
}

/// Deactivates the active grant; the row stays as history.
pub async fn revoke_role(pool: &SqlitePool, revoked_by: Option<i64>, user_id: i64, role_id: i64) -> AppResult<()> {
    let user_exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM usuario WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if user_exists == 0 {
        return Err(AppError::not_found("user not found"));
    }

    let result = sqlx::query(
        "UPDATE usuario_perfil SET ativo = 0, data_revogacao = ? WHERE usuario_id = ? AND perfil_id = ? AND ativo = 1",
    )
    .bind(utc_now())
    .bind(user_id)
    .bind(role_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("grant not found"));
    }

    tracing::info!(user_id, role_id, revoked_by, "role revoked");
    Ok(())
}

/// Deactivates every grant of a user, used when the user is deactivated.
pub async fn revoke_all(conn: &mut SqliteConnection, user_id: i64) -> AppResult<u64> {
    let result = sqlx::query("UPDATE usuario_perfil SET ativo = 0, data_revogacao = ? WHERE usuario_id = ? AND ativo = 1")
        .bind(utc_now())
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
