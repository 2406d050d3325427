use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::routes::users::insert_user;
use crate::session::{grants, RoleKind};
use crate::utils::{normalize_document, utc_now};

/// Creates an administrator, or re-activates the account with that email,
/// and makes sure it holds an active Administrador grant.
pub async fn ensure_admin(pool: &SqlitePool, nome: &str, email: &str, cpf: &str, senha: &str) -> AppResult<i64> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM usuario WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

    let user_id = match existing {
        Some(id) => {
            sqlx::query("UPDATE usuario SET ativo = 1, updated_at = ? WHERE id = ?")
                .bind(utc_now())
                .bind(id)
                .execute(&mut *tx)
                .await?;
            id
        }
        None => {
            let cpf = normalize_document(cpf, 11, "cpf")?;
            insert_user(&mut tx, nome, email, &cpf, senha, Some(RoleKind::Administrator)).await?.id
        }
    };

    grants::grant_roles(
        &mut tx,
        None,
        user_id,
        &[RoleKind::Administrator.id()],
        Some("bootstrap"),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id, "administrator ensured");
    Ok(user_id)
}
