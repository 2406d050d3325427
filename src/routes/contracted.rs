use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::app::AppState;
use crate::authz::{Action, Principal};
use crate::errors::{conflict_on_unique, AppError, AppResult};
use crate::models::contracted::{Contracted, ContractedCreateRequest, ContractedUpdateRequest, CONTRACTED_COLUMNS};
use crate::utils::{normalize_document, utc_now};

#[utoipa::path(
    get,
    path = "/contratados",
    tag = "Contratados",
    responses((status = 200, description = "Active contracted parties", body = [Contracted])),
    security(("bearerAuth" = []))
)]
pub async fn list_contracted(State(state): State<AppState>, _principal: Principal) -> AppResult<Json<Vec<Contracted>>> {
    let rows = sqlx::query_as::<_, Contracted>(&format!(
        "SELECT {CONTRACTED_COLUMNS} FROM contratado WHERE ativo = 1 ORDER BY nome"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/contratados",
    tag = "Contratados",
    request_body = ContractedCreateRequest,
    responses(
        (status = 201, description = "Contracted party created", body = Contracted),
        (status = 409, description = "CNPJ or CPF already registered")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_contracted(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<ContractedCreateRequest>,
) -> AppResult<(StatusCode, Json<Contracted>)> {
    principal.require(Action::ManageContractedParties)?;
    payload.validate()?;

    let cnpj = payload
        .cnpj
        .as_deref()
        .map(|raw| normalize_document(raw, 14, "cnpj"))
        .transpose()?;
    let cpf = payload
        .cpf
        .as_deref()
        .map(|raw| normalize_document(raw, 11, "cpf"))
        .transpose()?;
    if cnpj.is_none() && cpf.is_none() {
        return Err(AppError::bad_request("either cnpj or cpf is required"));
    }

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO contratado (nome, email, cnpj, cpf, telefone, ativo, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(&payload.nome)
    .bind(&payload.email)
    .bind(&cnpj)
    .bind(&cpf)
    .bind(&payload.telefone)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await
    .map_err(|err| conflict_on_unique(err, "cnpj or cpf already registered"))?;

    let contracted = fetch_contracted(&state.pool, result.last_insert_rowid()).await?;
    Ok((StatusCode::CREATED, Json(contracted)))
}

#[utoipa::path(
    get,
    path = "/contratados/{id}",
    tag = "Contratados",
    params(("id" = i64, Path, description = "Contracted party id")),
    responses((status = 200, description = "Contracted party", body = Contracted)),
    security(("bearerAuth" = []))
)]
pub async fn get_contracted(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Contracted>> {
    Ok(Json(fetch_contracted(&state.pool, id).await?))
}

#[utoipa::path(
    patch,
    path = "/contratados/{id}",
    tag = "Contratados",
    params(("id" = i64, Path, description = "Contracted party id")),
    request_body = ContractedUpdateRequest,
    responses((status = 200, description = "Contracted party updated", body = Contracted)),
    security(("bearerAuth" = []))
)]
pub async fn update_contracted(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<ContractedUpdateRequest>,
) -> AppResult<Json<Contracted>> {
    principal.require(Action::ManageContractedParties)?;
    payload.validate()?;

    let mut contracted = fetch_contracted(&state.pool, id).await?;
    if let Some(nome) = payload.nome {
        contracted.nome = nome;
    }
    if let Some(email) = payload.email {
        contracted.email = email;
    }
    if payload.telefone.is_some() {
        contracted.telefone = payload.telefone;
    }

    let now = utc_now();
    sqlx::query("UPDATE contratado SET nome = ?, email = ?, telefone = ?, updated_at = ? WHERE id = ?")
        .bind(&contracted.nome)
        .bind(&contracted.email)
        .bind(&contracted.telefone)
        .bind(now)
        .bind(contracted.id)
        .execute(&state.pool)
        .await?;

    contracted.updated_at = now;
    Ok(Json(contracted))
}

#[utoipa::path(
    delete,
    path = "/contratados/{id}",
    tag = "Contratados",
    params(("id" = i64, Path, description = "Contracted party id")),
    responses(
        (status = 204, description = "Contracted party deactivated"),
        (status = 409, description = "Contracted party still has active contracts")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_contracted(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    principal.require(Action::ManageContractedParties)?;
    let _ = fetch_contracted(&state.pool, id).await?;

    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM contrato WHERE contratado_id = ? AND ativo = 1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if in_use > 0 {
        return Err(AppError::conflict("contracted party still has active contracts"));
    }

    sqlx::query("UPDATE contratado SET ativo = 0, updated_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_contracted(pool: &SqlitePool, id: i64) -> AppResult<Contracted> {
    sqlx::query_as::<_, Contracted>(&format!(
        "SELECT {CONTRACTED_COLUMNS} FROM contratado WHERE id = ? AND ativo = 1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("contracted party not found"))
}
