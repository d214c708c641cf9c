use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use cloudaudit_core::{
    ValidationError,
    aggregate::{ReportDocument, render_markdown},
    jobs::RunRequest,
};
use cloudaudit_model::{
    CategoryDescriptor, Job, JobId, JobStatusQuery, JobStatusResponse,
    ReportFormat, ReportQuery, RunAuditAccepted, RunAuditRequest,
    RunAuditResponse,
};
use tracing::{info, warn};

use super::{parse_job_id, session_from};
use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Start an audit. By default the request is held until the job is
/// terminal; `"wait": false` answers `202` as soon as the job is running.
pub async fn run_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RunAuditRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) =
        payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let request = RunRequest::parse(
        session_from(&headers),
        body.project_id.as_deref(),
        body.category.as_deref(),
    )?;
    state.rate_limiter.check(&request.project)?;

    if body.wait == Some(false) {
        let job = state.dispatcher.submit(request).await?;
        info!(job_id = %job.id, "audit accepted for background execution");
        let accepted = RunAuditAccepted {
            success: true,
            job_id: job.id,
            status: job.status.into(),
            message: format!(
                "Audit of {} for project {} started",
                job.category, job.project_ref
            ),
        };
        return Ok((StatusCode::ACCEPTED, Json(accepted)).into_response());
    }

    let outcome = state.dispatcher.run(request).await?;
    let job = outcome.job;
    if let Some(failure) = outcome.failure {
        warn!(job_id = %job.id, error = %failure, "audit failed");
        return Err(AppError::from(failure).with_job(job.id));
    }

    let results = job.result.ok_or_else(|| {
        AppError::internal(format!("Job {} completed without a result", job.id))
            .with_job(job.id)
    })?;

    Ok(Json(RunAuditResponse {
        success: true,
        job_id: job.id,
        status: job.status.into(),
        results,
    })
    .into_response())
}

/// Poll a job; failed jobs read as `error` with their message.
pub async fn job_status(
    State(state): State<AppState>,
    query: Result<Query<JobStatusQuery>, QueryRejection>,
) -> AppResult<Json<JobStatusResponse>> {
    let Query(query) =
        query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let raw = query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingJobId)?;

    let job = find_job(&state, parse_job_id(&raw)?).await?;
    Ok(Json(JobStatusResponse::from_job(&job)))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Job>> {
    let job = find_job(&state, parse_job_id(&id)?).await?;
    Ok(Json(job))
}

/// Render a completed job as Markdown (default) or JSON.
pub async fn job_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) =
        query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let job = find_job(&state, parse_job_id(&id)?).await?;
    let document = ReportDocument::from_job(&job)?;

    let response = match query.format.unwrap_or_default() {
        ReportFormat::Json => Json(document).into_response(),
        ReportFormat::Markdown => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_markdown(&document),
        )
            .into_response(),
    };
    Ok(response)
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Json<Vec<CategoryDescriptor>> {
    Json(state.dispatcher.runner().registry().descriptors())
}

async fn find_job(state: &AppState, id: JobId) -> AppResult<Job> {
    state
        .dispatcher
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))
}
