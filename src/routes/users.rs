use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use validator::Validate;

use crate::app::AppState;
use crate::authz::{Action, Principal};
use crate::errors::{conflict_on_unique, AppError, AppResult};
use crate::models::role::{Grant, GrantRolesRequest};
use crate::models::user::{DbUser, User, UserCreateRequest, UserUpdateRequest, USER_COLUMNS};
use crate::session::{grants, manager, RoleKind};
use crate::utils::{hash_password, normalize_document, utc_now};

#[utoipa::path(
    get,
    path = "/usuarios",
    tag = "Usuários",
    responses((status = 200, description = "Active users", body = [User])),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<User>>> {
    principal.require(Action::ManageUsers)?;

    let users = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM usuario WHERE ativo = 1 ORDER BY nome"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(users.into_iter().map(User::from).collect()))
}

#[utoipa::path(
    post,
    path = "/usuarios",
    tag = "Usuários",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Email or CPF already registered")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    principal.require(Action::ManageUsers)?;
    payload.validate()?;

    let cpf = normalize_document(&payload.cpf, 11, "cpf")?;
    let initial_role = payload
        .perfil_id
        .map(|id| RoleKind::from_id(id).ok_or_else(|| AppError::bad_request(format!("role {id} does not exist"))))
        .transpose()?;

    ensure_identity_available(&state.pool, &payload.email, &cpf).await?;

    // The user row and its initial grant are committed together or not at all.
    let mut tx = state.pool.begin().await?;
    let user = insert_user(&mut tx, &payload.nome, &payload.email, &cpf, &payload.senha, initial_role).await?;
    if let Some(role) = initial_role {
        grants::grant_roles(&mut tx, Some(principal.user_id), user.id, &[role.id()], Some("perfil inicial")).await?;
    }
    tx.commit().await?;

    tracing::info!(user_id = user.id, created_by = principal.user_id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/usuarios/{id}",
    tag = "Usuários",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "User detail", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    // Other users' records are invisible outside user administration.
    if id != principal.user_id && !principal.can(Action::ManageUsers) {
        return Err(AppError::not_found("user not found"));
    }
    let user = fetch_user(&state.pool, id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    patch,
    path = "/usuarios/{id}",
    tag = "Usuários",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "User updated", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    principal.require(Action::ManageUsers)?;
    payload.validate()?;

    let mut user = fetch_user(&state.pool, id).await?;
    if let Some(nome) = payload.nome {
        user.nome = nome;
    }
    if let Some(email) = payload.email {
        user.email = email;
    }

    let now = utc_now();
    sqlx::query("UPDATE usuario SET nome = ?, email = ?, updated_at = ? WHERE id = ?")
        .bind(&user.nome)
        .bind(&user.email)
        .bind(now)
        .bind(user.id)
        .execute(&state.pool)
        .await
        .map_err(|err| conflict_on_unique(err, "email already in use"))?;

    user.updated_at = now;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/usuarios/{id}",
    tag = "Usuários",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 204, description = "User deactivated")),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    principal.require(Action::ManageUsers)?;
    if id == principal.user_id {
        return Err(AppError::bad_request("administrators cannot deactivate themselves"));
    }
    let _ = fetch_user(&state.pool, id).await?;

    let mut tx = state.pool.begin().await?;
    sqlx::query("UPDATE usuario SET ativo = 0, updated_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let revoked = grants::revoke_all(&mut tx, id).await?;
    let sessions = manager::end_user_sessions(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(user_id = id, revoked, sessions, deactivated_by = principal.user_id, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/usuarios/{id}/perfis",
    tag = "Usuários",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Active role grants", body = [Grant])),
    security(("bearerAuth" = []))
)]
pub async fn list_user_roles(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Grant>>> {
    if id != principal.user_id && !principal.can(Action::ManageGrants) {
        return Err(AppError::not_found("user not found"));
    }
    let _ = fetch_user(&state.pool, id).await?;
    Ok(Json(grants::list_grants(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/usuarios/{id}/perfis/conceder",
    tag = "Usuários",
    params(("id" = i64, Path, description = "User id")),
    request_body = GrantRolesRequest,
    responses(
        (status = 200, description = "Grants after the operation", body = [Grant]),
        (status = 404, description = "User or role not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_user_roles(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<GrantRolesRequest>,
) -> AppResult<Json<Vec<Grant>>> {
    principal.require(Action::ManageGrants)?;
    payload.validate()?;

    let mut tx = state.pool.begin().await?;
    let granted = grants::grant_roles(
        &mut tx,
        Some(principal.user_id),
        id,
        &payload.perfil_ids,
        payload.observacoes.as_deref(),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(granted))
}

#[utoipa::path(
    delete,
    path = "/usuarios/{id}/perfis/{perfil_id}",
    tag = "Usuários",
    params(
        ("id" = i64, Path, description = "User id"),
        ("perfil_id" = i64, Path, description = "Role id")
    ),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 404, description = "No active grant for this role")
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_user_role(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, perfil_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    principal.require(Action::ManageGrants)?;
    grants::revoke_role(&state.pool, Some(principal.user_id), id, perfil_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Inserts a user row on the caller's connection. Shared with the bootstrap command.
pub async fn insert_user(
    conn: &mut SqliteConnection,
    nome: &str,
    email: &str,
    cpf: &str,
    senha: &str,
    legacy_role: Option<RoleKind>,
) -> AppResult<User> {
    let senha_hash = hash_password(senha)?;
    let now = utc_now();

    let result = sqlx::query(
        "INSERT INTO usuario (nome, email, cpf, senha_hash, perfil_id, ativo, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(nome)
    .bind(email)
    .bind(cpf)
    .bind(senha_hash)
    .bind(legacy_role.map(RoleKind::id))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|err| conflict_on_unique(err, "email or cpf already registered"))?;

    Ok(fetch_user(&mut *conn, result.last_insert_rowid()).await?.into())
}

async fn ensure_identity_available(pool: &SqlitePool, email: &str, cpf: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM usuario WHERE email = ? OR cpf = ?")
        .bind(email)
        .bind(cpf)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("email or cpf already registered"));
    }

    Ok(())
}

pub(crate) async fn fetch_user<'e, E: SqliteExecutor<'e>>(executor: E, user_id: i64) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM usuario WHERE id = ? AND ativo = 1"
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}
