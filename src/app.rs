use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, contracted, contracts, health, pendencies, reports, roles, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    Ok(router(AppState::new(pool, jwt_config)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/contexto", get(auth::context))
        .route("/alternar-perfil", post(auth::switch_role))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id", get(users::get_user).patch(users::update_user).delete(users::delete_user))
        .route("/:id/perfis", get(users::list_user_roles))
        .route("/:id/perfis/conceder", post(users::grant_user_roles))
        .route("/:id/perfis/:perfil_id", delete(users::revoke_user_role));

    let contracted_routes = Router::new()
        .route("/", get(contracted::list_contracted).post(contracted::create_contracted))
        .route(
            "/:id",
            get(contracted::get_contracted)
                .patch(contracted::update_contracted)
                .delete(contracted::delete_contracted),
        );

    // Pendencies and reports are scoped to a contract: /contratos/:contrato_id/...
    let contract_routes = Router::new()
        .route("/", get(contracts::list_contracts).post(contracts::create_contract))
        .route(
            "/:id",
            get(contracts::get_contract)
                .patch(contracts::update_contract)
                .delete(contracts::delete_contract),
        )
        .route(
            "/:id/pendencias",
            get(pendencies::list_pendencies).post(pendencies::create_pendency),
        )
        .route("/:id/pendencias/:pendencia_id/cancelar", patch(pendencies::cancel_pendency))
        .route("/:id/relatorios", get(reports::list_reports).post(reports::submit_report))
        .route("/:id/relatorios/:relatorio_id/analise", patch(reports::analyse_report));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/perfis", get(roles::list_roles))
        .route("/modalidades", get(roles::list_modalities))
        .route("/status", get(roles::list_statuses))
        .nest("/auth", auth_routes)
        .nest("/usuarios", user_routes)
        .nest("/contratados", contracted_routes)
        .nest("/contratos", contract_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
