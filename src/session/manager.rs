use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::catalog::RoleKind;
use super::context::{derive_context, plan_switch, SessionContext, SwitchOutcome};
use crate::errors::{AppError, AppResult};
use crate::utils::utc_now;

/// Roles the user may currently act as: active grants joined with active catalog rows.
pub async fn active_roles(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<RoleKind>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT p.id FROM usuario_perfil up INNER JOIN perfil p ON p.id = up.perfil_id WHERE up.usuario_id = ? AND up.ativo = 1 AND p.ativo = 1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let roles = ids
        .into_iter()
        .filter_map(|id| {
            let role = RoleKind::from_id(id);
            if role.is_none() {
                tracing::warn!(user_id, role_id = id, "grant references a role outside the catalog");
            }
            role
        })
        .collect();

    Ok(roles)
}

/// Opens a new session for a freshly authenticated user.
pub async fn establish_context(pool: &SqlitePool, user_id: i64) -> AppResult<SessionContext> {
    let granted = active_roles(pool, user_id).await?;
    let session_id = Uuid::new_v4();
    let context = derive_context(user_id, session_id, &granted, None)?;

    let now = utc_now();
    sqlx::query(
        "INSERT INTO sessao_contexto (sessao_id, usuario_id, perfil_ativo_id, created_at, last_activity_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&context.sessao_id)
    .bind(user_id)
    .bind(context.perfil_ativo_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(
        user_id,
        session_id = %context.sessao_id,
        role = %context.active_role,
        available = context.perfis_disponiveis.len(),
        "session established"
    );

    Ok(context)
}

/// Rebuilds the context of an existing session against the current grants.
///
/// The session row is only rewritten when the active role fell back or the
/// recorded activity is older than [`ACTIVITY_REFRESH_MINUTES`].
pub async fn load_context(pool: &SqlitePool, user_id: i64, session_id: Uuid) -> AppResult<SessionContext> {
    let record: Option<(i64, Option<i64>, DateTime<Utc>)> = sqlx::query_as(
        "SELECT usuario_id, perfil_ativo_id, last_activity_at FROM sessao_contexto WHERE sessao_id = ?",
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    let (owner_id, preferred_id, last_activity_at) =
        record.ok_or_else(|| AppError::unauthorized("session has ended"))?;
    if owner_id != user_id {
        return Err(AppError::unauthorized("session does not belong to this user"));
    }

    let granted = active_roles(pool, user_id).await?;
    let preferred = preferred_id.and_then(RoleKind::from_id);
    let context = derive_context(user_id, session_id, &granted, preferred)?;

    let role_changed = preferred != Some(context.active_role);
    if role_changed {
        tracing::info!(
            user_id,
            session_id = %session_id,
            role = %context.active_role,
            "active role no longer granted, falling back"
        );
    }

    let now = utc_now();
    if role_changed || activity_is_stale(last_activity_at, now) {
        sqlx::query("UPDATE sessao_contexto SET perfil_ativo_id = ?, last_activity_at = ? WHERE sessao_id = ?")
            .bind(context.perfil_ativo_id)
            .bind(now)
            .bind(session_id.to_string())
            .execute(pool)
            .await?;
    }

    Ok(context)
}

pub const ACTIVITY_REFRESH_MINUTES: i64 = 5;

fn activity_is_stale(last_activity_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_activity_at >= Duration::minutes(ACTIVITY_REFRESH_MINUTES)
}

/// Changes the active role of a session. Session and user ids never change.
pub async fn switch_role(
    pool: &SqlitePool,
    current: &SessionContext,
    requested_role_id: i64,
    justification: Option<&str>,
) -> AppResult<SessionContext> {
    let session_id = current.session_uuid()?;
    let granted = active_roles(pool, current.usuario_id).await?;
    let fresh = derive_context(current.usuario_id, session_id, &granted, Some(current.active_role))?;

    let target = match plan_switch(&fresh, requested_role_id)? {
        SwitchOutcome::Unchanged => return Ok(fresh),
        SwitchOutcome::Switched(target) => target,
    };

    sqlx::query("UPDATE sessao_contexto SET perfil_ativo_id = ?, last_activity_at = ? WHERE sessao_id = ?")
        .bind(target.id())
        .bind(utc_now())
        .bind(session_id.to_string())
        .execute(pool)
        .await?;

    tracing::info!(
        user_id = current.usuario_id,
        session_id = %session_id,
        from = %fresh.active_role,
        to = %target,
        justificativa = justification.unwrap_or(""),
        "active role switched"
    );

    derive_context(current.usuario_id, session_id, &granted, Some(target))
}

pub async fn end_session(pool: &SqlitePool, session_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM sessao_contexto WHERE sessao_id = ?")
        .bind(session_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn end_user_sessions(conn: &mut SqliteConnection, user_id: i64) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM sessao_contexto WHERE usuario_id = ?")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_activity_is_not_rewritten() {
        let now = utc_now();
        assert!(!activity_is_stale(now - Duration::seconds(30), now));
        assert!(activity_is_stale(now - Duration::minutes(ACTIVITY_REFRESH_MINUTES), now));
        assert!(activity_is_stale(now - Duration::hours(2), now));
    }
}
