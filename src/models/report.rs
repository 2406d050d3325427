use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReportStatus {
    #[serde(rename = "Pendente de Análise")]
    PendingAnalysis,
    #[serde(rename = "Aprovado")]
    Approved,
    #[serde(rename = "Rejeitado com Pendência")]
    RejectedWithPendency,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::PendingAnalysis => "Pendente de Análise",
            ReportStatus::Approved => "Aprovado",
            ReportStatus::RejectedWithPendency => "Rejeitado com Pendência",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "Pendente de Análise" => Ok(ReportStatus::PendingAnalysis),
            "Aprovado" => Ok(ReportStatus::Approved),
            "Rejeitado com Pendência" => Ok(ReportStatus::RejectedWithPendency),
            other => Err(AppError::internal(format!("unknown report status: {other}"))),
        }
    }

    pub fn analyse(self, approved: bool) -> Result<Self, AppError> {
        if self != ReportStatus::PendingAnalysis {
            return Err(AppError::bad_request(format!(
                "report is {} and was already analysed",
                self.as_str()
            )));
        }
        Ok(if approved {
            ReportStatus::Approved
        } else {
            ReportStatus::RejectedWithPendency
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Report {
    pub id: i64,
    pub contrato_id: i64,
    pub pendencia_id: i64,
    pub fiscal_usuario_id: i64,
    #[schema(example = "2024-03")]
    pub mes_competencia: String,
    pub observacoes_fiscal: Option<String>,
    pub arquivo_nome: Option<String>,
    pub status: ReportStatus,
    pub aprovador_usuario_id: Option<i64>,
    pub observacoes_aprovador: Option<String>,
    pub data_envio: DateTime<Utc>,
    pub data_analise: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbReport {
    pub id: i64,
    pub contrato_id: i64,
    pub pendencia_id: i64,
    pub fiscal_usuario_id: i64,
    pub mes_competencia: String,
    pub observacoes_fiscal: Option<String>,
    pub arquivo_nome: Option<String>,
    pub status: String,
    pub aprovador_usuario_id: Option<i64>,
    pub observacoes_aprovador: Option<String>,
    pub data_envio: DateTime<Utc>,
    pub data_analise: Option<DateTime<Utc>>,
}

impl TryFrom<DbReport> for Report {
    type Error = AppError;

    fn try_from(value: DbReport) -> Result<Self, Self::Error> {
        Ok(Report {
            id: value.id,
            contrato_id: value.contrato_id,
            pendencia_id: value.pendencia_id,
            fiscal_usuario_id: value.fiscal_usuario_id,
            mes_competencia: value.mes_competencia,
            observacoes_fiscal: value.observacoes_fiscal,
            arquivo_nome: value.arquivo_nome,
            status: ReportStatus::parse(&value.status)?,
            aprovador_usuario_id: value.aprovador_usuario_id,
            observacoes_aprovador: value.observacoes_aprovador,
            data_envio: value.data_envio,
            data_analise: value.data_analise,
        })
    }
}

pub const REPORT_COLUMNS: &str = "id, contrato_id, pendencia_id, fiscal_usuario_id, mes_competencia, observacoes_fiscal, arquivo_nome, status, aprovador_usuario_id, observacoes_aprovador, data_envio, data_analise";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReportSubmitRequest {
    pub pendencia_id: i64,
    #[validate(custom(function = "validate_competence_month"))]
    #[schema(example = "2024-03")]
    pub mes_competencia: String,
    #[validate(length(max = 2000))]
    pub observacoes_fiscal: Option<String>,
    #[validate(length(max = 255))]
    #[schema(example = "relatorio_marco.pdf")]
    pub arquivo_nome: Option<String>,
}

/// Competence month as `YYYY-MM`.
fn validate_competence_month(value: &str) -> Result<(), ValidationError> {
    let well_formed = value.len() == 7
        && NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("mes_competencia").with_message("expected YYYY-MM".into()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReportAnalysisRequest {
    pub aprovado: bool,
    #[validate(length(max = 2000))]
    #[schema(example = "Faltou a planilha de medição")]
    pub observacoes_aprovador: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_reports_can_be_analysed() {
        assert_eq!(ReportStatus::PendingAnalysis.analyse(true).unwrap(), ReportStatus::Approved);
        assert_eq!(
            ReportStatus::PendingAnalysis.analyse(false).unwrap(),
            ReportStatus::RejectedWithPendency
        );
        assert!(ReportStatus::Approved.analyse(false).is_err());
        assert!(ReportStatus::RejectedWithPendency.analyse(true).is_err());
    }

    #[test]
    fn status_serializes_with_display_name() {
        let value = serde_json::to_value(ReportStatus::RejectedWithPendency).unwrap();
        assert_eq!(value, serde_json::json!("Rejeitado com Pendência"));
    }

    fn submission(mes_competencia: &str) -> ReportSubmitRequest {
        ReportSubmitRequest {
            pendencia_id: 1,
            mes_competencia: mes_competencia.to_string(),
            observacoes_fiscal: None,
            arquivo_nome: None,
        }
    }

    #[test]
    fn competence_month_must_be_a_real_month() {
        assert!(submission("2024-03").validate().is_ok());
        assert!(submission("2024-12").validate().is_ok());

        for bad in ["abcdefg", "2024-13", "2024-00", "2024-3", "03/2024", "2024-03-01"] {
            assert!(submission(bad).validate().is_err(), "{bad} should be rejected");
        }
    }
}
