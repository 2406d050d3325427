use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::app::AppState;
use crate::authz::{Action, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::pendency::{DbPendency, Pendency, PendencyCreateRequest, PendencyStatus, PENDENCY_COLUMNS};
use crate::routes::contracts::fetch_contract;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/contratos/{contrato_id}/pendencias",
    tag = "Pendências",
    params(("contrato_id" = i64, Path, description = "Contract id")),
    responses((status = 200, description = "Pendencies of the contract", body = [Pendency])),
    security(("bearerAuth" = []))
)]
pub async fn list_pendencies(
    State(state): State<AppState>,
    principal: Principal,
    Path(contrato_id): Path<i64>,
) -> AppResult<Json<Vec<Pendency>>> {
    let contract = fetch_contract(&state.pool, principal.contract_scope(), contrato_id).await?;

    let rows = sqlx::query_as::<_, DbPendency>(&format!(
        "SELECT {PENDENCY_COLUMNS} FROM pendencia WHERE contrato_id = ? ORDER BY data_prazo, id"
    ))
    .bind(contract.id)
    .fetch_all(&state.pool)
    .await?;

    let pendencies: Vec<Pendency> = rows
        .into_iter()
        .map(Pendency::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(pendencies))
}

#[utoipa::path(
    post,
    path = "/contratos/{contrato_id}/pendencias",
    tag = "Pendências",
    params(("contrato_id" = i64, Path, description = "Contract id")),
    request_body = PendencyCreateRequest,
    responses(
        (status = 201, description = "Pendency created", body = Pendency),
        (status = 403, description = "Active role may not create pendencies")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_pendency(
    State(state): State<AppState>,
    principal: Principal,
    Path(contrato_id): Path<i64>,
    Json(payload): Json<PendencyCreateRequest>,
) -> AppResult<(StatusCode, Json<Pendency>)> {
    principal.require(Action::CreatePendency)?;
    payload.validate()?;

    let contract = fetch_contract(&state.pool, principal.contract_scope(), contrato_id).await?;

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO pendencia (contrato_id, descricao, data_prazo, status, criado_por, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(contract.id)
    .bind(&payload.descricao)
    .bind(payload.data_prazo)
    .bind(PendencyStatus::Pending.as_str())
    .bind(principal.user_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let pendency: Pendency = fetch_pendency(&state.pool, contract.id, result.last_insert_rowid())
        .await?
        .try_into()?;
    tracing::info!(pendency_id = pendency.id, contract_id = contract.id, "pendency created");

    Ok((StatusCode::CREATED, Json(pendency)))
}

#[utoipa::path(
    patch,
    path = "/contratos/{contrato_id}/pendencias/{pendencia_id}/cancelar",
    tag = "Pendências",
    params(
        ("contrato_id" = i64, Path, description = "Contract id"),
        ("pendencia_id" = i64, Path, description = "Pendency id")
    ),
    responses(
        (status = 200, description = "Pendency cancelled", body = Pendency),
        (status = 400, description = "Pendency already concluded or cancelled"),
        (status = 409, description = "Pendency changed concurrently")
    ),
    security(("bearerAuth" = []))
)]
pub async fn cancel_pendency(
    State(state): State<AppState>,
    principal: Principal,
    Path((contrato_id, pendencia_id)): Path<(i64, i64)>,
) -> AppResult<Json<Pendency>> {
    principal.require(Action::CancelPendency)?;

    let contract = fetch_contract(&state.pool, principal.contract_scope(), contrato_id).await?;
    let mut pendency: Pendency = fetch_pendency(&state.pool, contract.id, pendencia_id).await?.try_into()?;

    let next = pendency.status.cancel()?;
    let now = utc_now();
    let moved = sqlx::query("UPDATE pendencia SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(next.as_str())
        .bind(now)
        .bind(pendency.id)
        .bind(pendency.status.as_str())
        .execute(&state.pool)
        .await?;
    if moved.rows_affected() == 0 {
        return Err(AppError::conflict("pendency changed while it was being cancelled"));
    }

    tracing::info!(pendency_id = pendency.id, cancelled_by = principal.user_id, "pendency cancelled");

    pendency.status = next;
    pendency.updated_at = now;
    Ok(Json(pendency))
}

pub(crate) async fn fetch_pendency(pool: &SqlitePool, contrato_id: i64, pendencia_id: i64) -> AppResult<DbPendency> {
    sqlx::query_as::<_, DbPendency>(&format!(
        "SELECT {PENDENCY_COLUMNS} FROM pendencia WHERE id = ? AND contrato_id = ?"
    ))
    .bind(pendencia_id)
    .bind(contrato_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("pendency not found"))
}
