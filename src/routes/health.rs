use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub db_ok: bool,
    pub db_error: Option<String>,
    /// Active entries in the role catalog; 3 on a correctly migrated database.
    pub perfis: Option<i64>,
}

impl HealthResponse {
    fn healthy(perfis: i64) -> Self {
        Self { status: "ok", db_ok: true, db_error: None, perfis: Some(perfis) }
    }

    fn degraded() -> Self {
        Self {
            status: "degraded",
            db_ok: false,
            db_error: Some("database unavailable".to_string()),
            perfis: None,
        }
    }
}

/// Always answers 200; a failing database shows up as `db_ok: false`.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Service and database status", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let check = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM perfil WHERE ativo = 1")
        .fetch_one(&state.pool)
        .await;

    Json(match check {
        Ok(perfis) => HealthResponse::healthy(perfis),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            HealthResponse::degraded()
        }
    })
}
