use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::AppError;

/// Pendency lifecycle.
///
/// ```text
/// Pendente --report submitted--> Aguardando Análise --approved--> Concluída
///    ^                                  |
///    +-----------rejected---------------+
/// Pendente | Aguardando Análise --cancel--> Cancelada
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PendencyStatus {
    #[serde(rename = "Pendente")]
    Pending,
    #[serde(rename = "Aguardando Análise")]
    AwaitingAnalysis,
    #[serde(rename = "Concluída")]
    Concluded,
    #[serde(rename = "Cancelada")]
    Cancelled,
}

impl PendencyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PendencyStatus::Pending => "Pendente",
            PendencyStatus::AwaitingAnalysis => "Aguardando Análise",
            PendencyStatus::Concluded => "Concluída",
            PendencyStatus::Cancelled => "Cancelada",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "Pendente" => Ok(PendencyStatus::Pending),
            "Aguardando Análise" => Ok(PendencyStatus::AwaitingAnalysis),
            "Concluída" => Ok(PendencyStatus::Concluded),
            "Cancelada" => Ok(PendencyStatus::Cancelled),
            other => Err(AppError::internal(format!("unknown pendency status: {other}"))),
        }
    }

    /// A resubmission while awaiting analysis keeps the pendency there.
    pub fn on_report_submitted(self) -> Result<Self, AppError> {
        match self {
            PendencyStatus::Pending | PendencyStatus::AwaitingAnalysis => Ok(PendencyStatus::AwaitingAnalysis),
            PendencyStatus::Concluded | PendencyStatus::Cancelled => Err(AppError::bad_request(format!(
                "pendency is {} and accepts no reports",
                self.as_str()
            ))),
        }
    }

    pub fn on_report_analysed(self, approved: bool) -> Result<Self, AppError> {
        match (self, approved) {
            (PendencyStatus::AwaitingAnalysis, true) => Ok(PendencyStatus::Concluded),
            (PendencyStatus::AwaitingAnalysis, false) => Ok(PendencyStatus::Pending),
            _ => Err(AppError::bad_request(format!(
                "pendency is {} and is not awaiting analysis",
                self.as_str()
            ))),
        }
    }

    pub fn cancel(self) -> Result<Self, AppError> {
        match self {
            PendencyStatus::Pending | PendencyStatus::AwaitingAnalysis => Ok(PendencyStatus::Cancelled),
            PendencyStatus::Concluded | PendencyStatus::Cancelled => Err(AppError::bad_request(format!(
                "pendency is {} and cannot be cancelled",
                self.as_str()
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Pendency {
    pub id: i64,
    pub contrato_id: i64,
    pub descricao: String,
    pub data_prazo: NaiveDate,
    pub status: PendencyStatus,
    pub criado_por: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPendency {
    pub id: i64,
    pub contrato_id: i64,
    pub descricao: String,
    pub data_prazo: NaiveDate,
    pub status: String,
    pub criado_por: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbPendency> for Pendency {
    type Error = AppError;

    fn try_from(value: DbPendency) -> Result<Self, Self::Error> {
        Ok(Pendency {
            id: value.id,
            contrato_id: value.contrato_id,
            descricao: value.descricao,
            data_prazo: value.data_prazo,
            status: PendencyStatus::parse(&value.status)?,
            criado_por: value.criado_por,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

pub const PENDENCY_COLUMNS: &str =
    "id, contrato_id, descricao, data_prazo, status, criado_por, created_at, updated_at";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PendencyCreateRequest {
    #[validate(length(min = 1, max = 1000))]
    #[schema(example = "Relatório mensal de fiscalização - março")]
    pub descricao: String,
    #[schema(example = "2024-04-10")]
    pub data_prazo: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    use PendencyStatus::*;

    #[test]
    fn submission_moves_pending_to_awaiting_analysis() {
        assert_eq!(Pending.on_report_submitted().unwrap(), AwaitingAnalysis);
    }

    #[test]
    fn resubmission_does_not_regress() {
        assert_eq!(AwaitingAnalysis.on_report_submitted().unwrap(), AwaitingAnalysis);
    }

    #[test]
    fn closed_pendencies_refuse_reports() {
        assert!(Concluded.on_report_submitted().is_err());
        assert!(Cancelled.on_report_submitted().is_err());
    }

    #[test]
    fn analysis_outcomes() {
        assert_eq!(AwaitingAnalysis.on_report_analysed(true).unwrap(), Concluded);
        assert_eq!(AwaitingAnalysis.on_report_analysed(false).unwrap(), Pending);
        assert!(Pending.on_report_analysed(true).is_err());
        assert!(Concluded.on_report_analysed(false).is_err());
    }

    #[test]
    fn cancel_only_before_conclusion() {
        assert_eq!(Pending.cancel().unwrap(), Cancelled);
        assert_eq!(AwaitingAnalysis.cancel().unwrap(), Cancelled);
        assert!(Concluded.cancel().is_err());
        assert!(Cancelled.cancel().is_err());
    }

    #[test]
    fn status_names_round_trip() {
        for status in [Pending, AwaitingAnalysis, Concluded, Cancelled] {
            assert_eq!(PendencyStatus::parse(status.as_str()).unwrap(), status);
            assert_eq!(serde_json::to_value(status).unwrap(), serde_json::json!(status.as_str()));
        }
    }
}
