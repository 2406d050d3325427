use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Contract modality (procurement type).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Modality {
    pub id: i64,
    #[schema(example = "Pregão")]
    pub nome: String,
}

/// Contract status reference row.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ContractStatus {
    pub id: i64,
    #[schema(example = "Ativo")]
    pub nome: String,
}
