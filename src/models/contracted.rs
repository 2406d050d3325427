use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Contracted {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub cnpj: Option<String>,
    pub cpf: Option<String>,
    pub telefone: Option<String>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CONTRACTED_COLUMNS: &str =
    "id, nome, email, cnpj, cpf, telefone, ativo, created_at, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContractedCreateRequest {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Limpeza Total LTDA")]
    pub nome: String,
    #[validate(email)]
    #[schema(example = "contato@limpezatotal.com.br")]
    pub email: String,
    #[schema(example = "12.345.678/0001-90")]
    pub cnpj: Option<String>,
    pub cpf: Option<String>,
    #[schema(example = "(61) 3333-4444")]
    pub telefone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContractedUpdateRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub telefone: Option<String>,
}
