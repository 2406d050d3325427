use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::app::AppState;
use crate::authz::{Action, ContractScope, Principal};
use crate::errors::{conflict_on_unique, AppError, AppResult};
use crate::models::contract::{Contract, ContractCreateRequest, ContractUpdateRequest, CONTRACT_COLUMNS};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/contratos",
    tag = "Contratos",
    responses((status = 200, description = "Contracts visible to the active role", body = [Contract])),
    security(("bearerAuth" = []))
)]
pub async fn list_contracts(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Contract>>> {
    let scope = principal.contract_scope();
    let sql = format!(
        "SELECT {CONTRACT_COLUMNS} FROM contrato c WHERE c.ativo = 1 AND {} ORDER BY c.data_inicio DESC, c.id DESC",
        scope.predicate("c")
    );

    let mut query = sqlx::query_as::<_, Contract>(&sql);
    for value in scope.bind_values() {
        query = query.bind(value);
    }
    let contracts = query.fetch_all(&state.pool).await?;

    Ok(Json(contracts))
}

#[utoipa::path(
    post,
    path = "/contratos",
    tag = "Contratos",
    request_body = ContractCreateRequest,
    responses(
        (status = 201, description = "Contract created", body = Contract),
        (status = 403, description = "Active role may not create contracts"),
        (status = 409, description = "Contract number already in use")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_contract(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<ContractCreateRequest>,
) -> AppResult<(StatusCode, Json<Contract>)> {
    principal.require(Action::CreateContract)?;
    payload.validate()?;

    ensure_reference(&state.pool, "contratado", payload.contratado_id, "contracted party").await?;
    ensure_reference(&state.pool, "modalidade", payload.modalidade_id, "modality").await?;
    ensure_reference(&state.pool, "status", payload.status_id, "status").await?;
    ensure_active_user(&state.pool, payload.gestor_id, "gestor").await?;
    ensure_active_user(&state.pool, payload.fiscal_id, "fiscal").await?;
    if let Some(substitute) = payload.fiscal_substituto_id {
        ensure_active_user(&state.pool, substitute, "fiscal substituto").await?;
    }

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO contrato (nr_contrato, objeto, data_inicio, data_fim, valor_global, contratado_id, modalidade_id, status_id, gestor_id, fiscal_id, fiscal_substituto_id, ativo, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(&payload.nr_contrato)
    .bind(&payload.objeto)
    .bind(payload.data_inicio)
    .bind(payload.data_fim)
    .bind(payload.valor_global)
    .bind(payload.contratado_id)
    .bind(payload.modalidade_id)
    .bind(payload.status_id)
    .bind(payload.gestor_id)
    .bind(payload.fiscal_id)
    .bind(payload.fiscal_substituto_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await
    .map_err(|err| conflict_on_unique(err, "contract number already in use"))?;

    let contract = fetch_contract(&state.pool, ContractScope::All, result.last_insert_rowid()).await?;
    tracing::info!(contract_id = contract.id, created_by = principal.user_id, "contract created");

    Ok((StatusCode::CREATED, Json(contract)))
}

#[utoipa::path(
    get,
    path = "/contratos/{id}",
    tag = "Contratos",
    params(("id" = i64, Path, description = "Contract id")),
    responses(
        (status = 200, description = "Contract detail", body = Contract),
        (status = 404, description = "Contract absent or outside the active role's scope")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_contract(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<Json<Contract>> {
    let contract = fetch_contract(&state.pool, principal.contract_scope(), id).await?;
    Ok(Json(contract))
}

#[utoipa::path(
    patch,
    path = "/contratos/{id}",
    tag = "Contratos",
    params(("id" = i64, Path, description = "Contract id")),
    request_body = ContractUpdateRequest,
    responses((status = 200, description = "Contract updated", body = Contract)),
    security(("bearerAuth" = []))
)]
pub async fn update_contract(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(payload): Json<ContractUpdateRequest>,
) -> AppResult<Json<Contract>> {
    principal.require(Action::UpdateContract)?;
    payload.validate()?;

    let mut contract = fetch_contract(&state.pool, principal.contract_scope(), id).await?;

    if let Some(objeto) = payload.objeto {
        contract.objeto = objeto;
    }
    if let Some(data_inicio) = payload.data_inicio {
        contract.data_inicio = data_inicio;
    }
    if let Some(data_fim) = payload.data_fim {
        contract.data_fim = data_fim;
    }
    if contract.data_fim < contract.data_inicio {
        return Err(AppError::bad_request("data_fim must not precede data_inicio"));
    }
    if let Some(valor_global) = payload.valor_global {
        contract.valor_global = valor_global;
    }
    if let Some(status_id) = payload.status_id {
        ensure_reference(&state.pool, "status", status_id, "status").await?;
        contract.status_id = status_id;
    }
    if let Some(gestor_id) = payload.gestor_id {
        ensure_active_user(&state.pool, gestor_id, "gestor").await?;
        contract.gestor_id = gestor_id;
    }
    if let Some(fiscal_id) = payload.fiscal_id {
        ensure_active_user(&state.pool, fiscal_id, "fiscal").await?;
        contract.fiscal_id = fiscal_id;
    }
    if let Some(substitute) = payload.fiscal_substituto_id {
        ensure_active_user(&state.pool, substitute, "fiscal substituto").await?;
        contract.fiscal_substituto_id = Some(substitute);
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE contrato SET objeto = ?, data_inicio = ?, data_fim = ?, valor_global = ?, status_id = ?, gestor_id = ?, fiscal_id = ?, fiscal_substituto_id = ?, updated_at = ? WHERE id = ? AND ativo = 1",
    )
    .bind(&contract.objeto)
    .bind(contract.data_inicio)
    .bind(contract.data_fim)
    .bind(contract.valor_global)
    .bind(contract.status_id)
    .bind(contract.gestor_id)
    .bind(contract.fiscal_id)
    .bind(contract.fiscal_substituto_id)
    .bind(now)
    .bind(contract.id)
    .execute(&state.pool)
    .await?;

    contract.updated_at = now;
    Ok(Json(contract))
}

#[utoipa::path(
    delete,
    path = "/contratos/{id}",
    tag = "Contratos",
    params(("id" = i64, Path, description = "Contract id")),
    responses((status = 204, description = "Contract deactivated")),
    security(("bearerAuth" = []))
)]
pub async fn delete_contract(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    principal.require(Action::DeleteContract)?;

    let affected = sqlx::query("UPDATE contrato SET ativo = 0, updated_at = ? WHERE id = ? AND ativo = 1")
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("contract not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Loads an active contract, answering 404 when it lies outside `scope`.
pub(crate) async fn fetch_contract(pool: &SqlitePool, scope: ContractScope, id: i64) -> AppResult<Contract> {
    let sql = format!(
        "SELECT {CONTRACT_COLUMNS} FROM contrato c WHERE c.id = ? AND c.ativo = 1 AND {}",
        scope.predicate("c")
    );

    let mut query = sqlx::query_as::<_, Contract>(&sql).bind(id);
    for value in scope.bind_values() {
        query = query.bind(value);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("contract not found"))
}

async fn ensure_reference(pool: &SqlitePool, table: &'static str, id: i64, label: &str) -> AppResult<()> {
    let sql = format!("SELECT COUNT(1) FROM {table} WHERE id = ?");
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(pool).await?;
    if count == 0 {
        return Err(AppError::bad_request(format!("{label} {id} does not exist")));
    }
    Ok(())
}

async fn ensure_active_user(pool: &SqlitePool, user_id: i64, label: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM usuario WHERE id = ? AND ativo = 1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if count == 0 {
        return Err(AppError::bad_request(format!("{label} user {user_id} does not exist or is inactive")));
    }
    Ok(())
}
