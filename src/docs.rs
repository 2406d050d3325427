use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;
use crate::session;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::auth::login,
        routes::auth::context,
        routes::auth::switch_role,
        routes::auth::me,
        routes::auth::logout,
        routes::roles::list_roles,
        routes::roles::list_modalities,
        routes::roles::list_statuses,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::get_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::users::list_user_roles,
        routes::users::grant_user_roles,
        routes::users::revoke_user_role,
        routes::contracted::list_contracted,
        routes::contracted::create_contracted,
        routes::contracted::get_contracted,
        routes::contracted::update_contracted,
        routes::contracted::delete_contracted,
        routes::contracts::list_contracts,
        routes::contracts::create_contract,
        routes::contracts::get_contract,
        routes::contracts::update_contract,
        routes::contracts::delete_contract,
        routes::pendencies::list_pendencies,
        routes::pendencies::create_pendency,
        routes::pendencies::cancel_pendency,
        routes::reports::list_reports,
        routes::reports::submit_report,
        routes::reports::analyse_report
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::auth::MessageResponse,
            session::SessionContext,
            session::AvailableRole,
            models::user::User,
            models::user::UserCreateRequest,
            models::user::UserUpdateRequest,
            models::user::LoginForm,
            models::user::LoginResponse,
            models::role::Role,
            models::role::Grant,
            models::role::GrantRolesRequest,
            models::role::SwitchRoleRequest,
            models::reference::Modality,
            models::reference::ContractStatus,
            models::contracted::Contracted,
            models::contracted::ContractedCreateRequest,
            models::contracted::ContractedUpdateRequest,
            models::contract::Contract,
            models::contract::ContractCreateRequest,
            models::contract::ContractUpdateRequest,
            models::pendency::Pendency,
            models::pendency::PendencyStatus,
            models::pendency::PendencyCreateRequest,
            models::report::Report,
            models::report::ReportStatus,
            models::report::ReportSubmitRequest,
            models::report::ReportAnalysisRequest
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Login and session context"),
        (name = "Perfis", description = "Role catalog and reference data"),
        (name = "Usuários", description = "User and role-grant administration"),
        (name = "Contratados", description = "Contracted parties"),
        (name = "Contratos", description = "Contracts"),
        (name = "Pendências", description = "Contract pendencies"),
        (name = "Relatórios", description = "Fiscal reports")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_routes() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_session_endpoints() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc.get("paths").and_then(|p| p.as_object()).unwrap();

        assert!(paths.contains_key("/auth/login"));
        assert!(paths.contains_key("/auth/contexto"));
        assert!(paths.contains_key("/auth/alternar-perfil"));
        assert!(paths.contains_key("/usuarios/{id}/perfis/conceder"));
        assert!(doc.pointer("/components/securitySchemes/bearerAuth").is_some());
    }
}
