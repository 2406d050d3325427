use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::app::AppState;
use crate::authz::{Action, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::pendency::Pendency;
use crate::models::report::{
    DbReport, Report, ReportAnalysisRequest, ReportStatus, ReportSubmitRequest, REPORT_COLUMNS,
};
use crate::routes::contracts::fetch_contract;
use crate::routes::pendencies::fetch_pendency;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/contratos/{contrato_id}/relatorios",
    tag = "Relatórios",
    params(("contrato_id" = i64, Path, description = "Contract id")),
    responses((status = 200, description = "Reports of the contract", body = [Report])),
    security(("bearerAuth" = []))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    principal: Principal,
    Path(contrato_id): Path<i64>,
) -> AppResult<Json<Vec<Report>>> {
    let contract = fetch_contract(&state.pool, principal.contract_scope(), contrato_id).await?;

    let rows = sqlx::query_as::<_, DbReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM relatorio WHERE contrato_id = ? ORDER BY data_envio DESC, id DESC"
    ))
    .bind(contract.id)
    .fetch_all(&state.pool)
    .await?;

    let reports: Vec<Report> = rows.into_iter().map(Report::try_from).collect::<Result<_, _>>()?;
    Ok(Json(reports))
}

#[utoipa::path(
    post,
    path = "/contratos/{contrato_id}/relatorios",
    tag = "Relatórios",
    params(("contrato_id" = i64, Path, description = "Contract id")),
    request_body = ReportSubmitRequest,
    responses(
        (status = 201, description = "Report submitted", body = Report),
        (status = 200, description = "Existing report for the pendency replaced", body = Report),
        (status = 400, description = "Pendency accepts no reports"),
        (status = 409, description = "Pendency changed concurrently"),
        (status = 403, description = "Active role may not submit reports"),
        (status = 404, description = "Contract or pendency not visible")
    ),
    security(("bearerAuth" = []))
)]
pub async fn submit_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(contrato_id): Path<i64>,
    Json(payload): Json<ReportSubmitRequest>,
) -> AppResult<(StatusCode, Json<Report>)> {
    principal.require(Action::SubmitReport)?;
    payload.validate()?;

    let contract = fetch_contract(&state.pool, principal.contract_scope(), contrato_id).await?;
    let pendency: Pendency = fetch_pendency(&state.pool, contract.id, payload.pendencia_id)
        .await?
        .try_into()?;
    let next = pendency.status.on_report_submitted()?;

    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    // The status guard is the first statement so the write lock is taken before anything is read.
    let moved = sqlx::query("UPDATE pendencia SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(next.as_str())
        .bind(now)
        .bind(pendency.id)
        .bind(pendency.status.as_str())
        .execute(&mut *tx)
        .await?;
    if moved.rows_affected() == 0 {
        return Err(AppError::conflict("pendency changed while the report was being submitted"));
    }

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM relatorio WHERE pendencia_id = ?")
        .bind(pendency.id)
        .fetch_optional(&mut *tx)
        .await?;

    // One report per pendency: a resubmission overwrites the row and clears the previous analysis.
    sqlx::query(
        r#"
        INSERT INTO relatorio (contrato_id, pendencia_id, fiscal_usuario_id, mes_competencia, observacoes_fiscal,
                               arquivo_nome, status, data_envio, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(pendencia_id) DO UPDATE SET
            fiscal_usuario_id = excluded.fiscal_usuario_id,
            mes_competencia = excluded.mes_competencia,
            observacoes_fiscal = excluded.observacoes_fiscal,
            arquivo_nome = excluded.arquivo_nome,
            status = excluded.status,
            aprovador_usuario_id = NULL,
            observacoes_aprovador = NULL,
            data_analise = NULL,
            data_envio = excluded.data_envio,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(contract.id)
    .bind(pendency.id)
    .bind(principal.user_id)
    .bind(&payload.mes_competencia)
    .bind(&payload.observacoes_fiscal)
    .bind(&payload.arquivo_nome)
    .bind(ReportStatus::PendingAnalysis.as_str())
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let report: Report = fetch_report_by_pendency(&state.pool, pendency.id).await?.try_into()?;
    tracing::info!(
        report_id = report.id,
        pendency_id = pendency.id,
        fiscal_id = principal.user_id,
        replaced = existing.is_some(),
        "report submitted"
    );

    let status = if existing.is_some() { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(report)))
}

#[utoipa::path(
    patch,
    path = "/contratos/{contrato_id}/relatorios/{relatorio_id}/analise",
    tag = "Relatórios",
    params(
        ("contrato_id" = i64, Path, description = "Contract id"),
        ("relatorio_id" = i64, Path, description = "Report id")
    ),
    request_body = ReportAnalysisRequest,
    responses(
        (status = 200, description = "Report analysed", body = Report),
        (status = 400, description = "Report already analysed"),
        (status = 409, description = "Report or pendency changed concurrently"),
        (status = 403, description = "Active role may not analyse reports")
    ),
    security(("bearerAuth" = []))
)]
pub async fn analyse_report(
    State(state): State<AppState>,
    principal: Principal,
    Path((contrato_id, relatorio_id)): Path<(i64, i64)>,
    Json(payload): Json<ReportAnalysisRequest>,
) -> AppResult<Json<Report>> {
    principal.require(Action::AnalyseReport)?;
    payload.validate()?;

    let contract = fetch_contract(&state.pool, principal.contract_scope(), contrato_id).await?;
    let mut report: Report = fetch_report(&state.pool, contract.id, relatorio_id).await?.try_into()?;
    let pendency: Pendency = fetch_pendency(&state.pool, contract.id, report.pendencia_id)
        .await?
        .try_into()?;

    let next_report = report.status.analyse(payload.aprovado)?;
    let next_pendency = pendency.status.on_report_analysed(payload.aprovado)?;

    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    // Both rows only move from the status checked above; a concurrent analysis leaves nothing to update.
    let analysed = sqlx::query(
        "UPDATE relatorio SET status = ?, aprovador_usuario_id = ?, observacoes_aprovador = ?, data_analise = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(next_report.as_str())
    .bind(principal.user_id)
    .bind(&payload.observacoes_aprovador)
    .bind(now)
    .bind(now)
    .bind(report.id)
    .bind(report.status.as_str())
    .execute(&mut *tx)
    .await?;
    if analysed.rows_affected() == 0 {
        return Err(AppError::conflict("report was analysed by another request"));
    }

    let moved = sqlx::query("UPDATE pendencia SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(next_pendency.as_str())
        .bind(now)
        .bind(pendency.id)
        .bind(pendency.status.as_str())
        .execute(&mut *tx)
        .await?;
    if moved.rows_affected() == 0 {
        return Err(AppError::conflict("pendency changed while the report was being analysed"));
    }

    tx.commit().await?;

    tracing::info!(
        report_id = report.id,
        pendency_id = pendency.id,
        approved = payload.aprovado,
        analysed_by = principal.user_id,
        "report analysed"
    );

    report.status = next_report;
    report.aprovador_usuario_id = Some(principal.user_id);
    report.observacoes_aprovador = payload.observacoes_aprovador;
    report.data_analise = Some(now);
    Ok(Json(report))
}

async fn fetch_report(pool: &SqlitePool, contrato_id: i64, relatorio_id: i64) -> AppResult<DbReport> {
    sqlx::query_as::<_, DbReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM relatorio WHERE id = ? AND contrato_id = ?"
    ))
    .bind(relatorio_id)
    .bind(contrato_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("report not found"))
}

async fn fetch_report_by_pendency(pool: &SqlitePool, pendencia_id: i64) -> AppResult<DbReport> {
    sqlx::query_as::<_, DbReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM relatorio WHERE pendencia_id = ?"
    ))
    .bind(pendencia_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("report not found"))
}
