use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppResult;
use crate::models::reference::{ContractStatus, Modality};
use crate::models::role::Role;

#[utoipa::path(
    get,
    path = "/perfis",
    tag = "Perfis",
    responses((status = 200, description = "Active role catalog in priority order", body = [Role])),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(State(state): State<AppState>, _principal: Principal) -> AppResult<Json<Vec<Role>>> {
    // Catalog ids follow priority order.
    let roles = sqlx::query_as::<_, Role>("SELECT id, nome FROM perfil WHERE ativo = 1 ORDER BY id")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(roles))
}

#[utoipa::path(
    get,
    path = "/modalidades",
    tag = "Perfis",
    responses((status = 200, description = "Contract modalities", body = [Modality])),
    security(("bearerAuth" = []))
)]
pub async fn list_modalities(State(state): State<AppState>, _principal: Principal) -> AppResult<Json<Vec<Modality>>> {
    let rows = sqlx::query_as::<_, Modality>("SELECT id, nome FROM modalidade ORDER BY nome")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "Perfis",
    responses((status = 200, description = "Contract statuses", body = [ContractStatus])),
    security(("bearerAuth" = []))
)]
pub async fn list_statuses(
    State(state): State<AppState>,
    _principal: Principal,
) -> AppResult<Json<Vec<ContractStatus>>> {
    let rows = sqlx::query_as::<_, ContractStatus>("SELECT id, nome FROM status ORDER BY id")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(rows))
}
