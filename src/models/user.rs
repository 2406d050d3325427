use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::session::SessionContext;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub cpf: String,
    /// Legacy single-role reference kept for older clients.
    pub perfil_id: Option<i64>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub senha_hash: String,
    pub perfil_id: Option<i64>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(value: DbUser) -> Self {
        User {
            id: value.id,
            nome: value.nome,
            email: value.email,
            cpf: value.cpf,
            perfil_id: value.perfil_id,
            ativo: value.ativo,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

pub const USER_COLUMNS: &str =
    "id, nome, email, cpf, senha_hash, perfil_id, ativo, created_at, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserCreateRequest {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Maria Souza")]
    pub nome: String,
    #[validate(email)]
    #[schema(example = "maria@orgao.gov.br")]
    pub email: String,
    #[schema(example = "123.456.789-09")]
    pub cpf: String,
    #[schema(example = "S3nh@Forte")]
    pub senha: String,
    /// Also granted as an active role when present.
    #[schema(example = 3)]
    pub perfil_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 200))]
    pub nome: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// OAuth2 password-style login form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    #[schema(example = "maria@orgao.gov.br")]
    pub username: String,
    #[schema(example = "S3nh@Forte")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    pub contexto_sessao: SessionContext,
}
