use axum::extract::State;
use axum::{Form, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::role::SwitchRoleRequest;
use crate::models::user::{DbUser, LoginForm, LoginResponse, User, USER_COLUMNS};
use crate::session::{self, SessionContext};
use crate::utils::verify_password;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "User has no active role")
    )
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Json<LoginResponse>> {
    let db_user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM usuario WHERE email = ? AND ativo = 1"
    ))
    .bind(&form.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&form.password, &db_user.senha_hash)? {
        tracing::debug!(user_id = db_user.id, "password mismatch");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let context = session::establish_context(&state.pool, db_user.id).await?;
    let access_token = state.jwt.encode(db_user.id, context.session_uuid()?)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        contexto_sessao: context,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/contexto",
    tag = "Auth",
    responses((status = 200, description = "Current session context", body = SessionContext)),
    security(("bearerAuth" = []))
)]
pub async fn context(principal: Principal) -> AppResult<Json<SessionContext>> {
    Ok(Json(principal.context))
}

#[utoipa::path(
    post,
    path = "/auth/alternar-perfil",
    tag = "Auth",
    request_body = SwitchRoleRequest,
    responses(
        (status = 200, description = "Active role switched", body = SessionContext),
        (status = 403, description = "Single role, or role not granted to the user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn switch_role(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<SwitchRoleRequest>,
) -> AppResult<Json<SessionContext>> {
    let context = session::switch_role(
        &state.pool,
        &principal.context,
        payload.novo_perfil_id,
        payload.justificativa.as_deref(),
    )
    .await?;

    Ok(Json(context))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<Json<User>> {
    let db_user = crate::routes::users::fetch_user(&state.pool, principal.user_id).await?;
    Ok(Json(db_user.into()))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Session ended", body = MessageResponse)),
    security(("bearerAuth" = []))
)]
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    session::manager::end_session(&state.pool, auth.session_id).await?;
    tracing::info!(user_id = auth.user_id, session_id = %auth.session_id, "session ended");

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
