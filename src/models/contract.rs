use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Contract {
    pub id: i64,
    #[schema(example = "12/2024")]
    pub nr_contrato: String,
    pub objeto: String,
    pub data_inicio: NaiveDate,
    pub data_fim: NaiveDate,
    pub valor_global: f64,
    pub contratado_id: i64,
    pub modalidade_id: i64,
    pub status_id: i64,
    pub gestor_id: i64,
    pub fiscal_id: i64,
    pub fiscal_substituto_id: Option<i64>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CONTRACT_COLUMNS: &str = "id, nr_contrato, objeto, data_inicio, data_fim, valor_global, contratado_id, modalidade_id, status_id, gestor_id, fiscal_id, fiscal_substituto_id, ativo, created_at, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_period"))]
pub struct ContractCreateRequest {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "12/2024")]
    pub nr_contrato: String,
    #[validate(length(min = 1))]
    #[schema(example = "Serviços de limpeza predial")]
    pub objeto: String,
    #[schema(example = "2024-01-01")]
    pub data_inicio: NaiveDate,
    #[schema(example = "2024-12-31")]
    pub data_fim: NaiveDate,
    #[validate(range(min = 0.0))]
    #[schema(example = 150000.0)]
    pub valor_global: f64,
    pub contratado_id: i64,
    pub modalidade_id: i64,
    pub status_id: i64,
    pub gestor_id: i64,
    pub fiscal_id: i64,
    pub fiscal_substituto_id: Option<i64>,
}

fn validate_period(req: &ContractCreateRequest) -> Result<(), ValidationError> {
    if req.data_fim < req.data_inicio {
        return Err(ValidationError::new("data_fim_before_data_inicio"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContractUpdateRequest {
    #[validate(length(min = 1))]
    pub objeto: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub valor_global: Option<f64>,
    pub status_id: Option<i64>,
    pub gestor_id: Option<i64>,
    pub fiscal_id: Option<i64>,
    pub fiscal_substituto_id: Option<i64>,
}
