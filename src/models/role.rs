use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    #[schema(example = 3)]
    pub id: i64,
    #[schema(example = "Fiscal")]
    pub nome: String,
}

/// An active (user, role) grant.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Grant {
    pub id: i64,
    pub usuario_id: i64,
    pub perfil_id: i64,
    pub perfil_nome: String,
    pub observacoes: Option<String>,
    pub concedido_por: Option<i64>,
    pub ativo: bool,
    pub data_concessao: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GrantRolesRequest {
    #[validate(length(min = 1, message = "at least one role is required"))]
    #[schema(example = json!([2, 3]))]
    pub perfil_ids: Vec<i64>,
    #[validate(length(max = 500))]
    #[schema(example = "Acumula gestão e fiscalização do contrato 12/2024")]
    pub observacoes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SwitchRoleRequest {
    #[schema(example = 3)]
    pub novo_perfil_id: i64,
    #[schema(example = "Registrar relatório fiscal")]
    pub justificativa: Option<String>,
}
