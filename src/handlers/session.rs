// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{answer::AnswerValue, question::QuestionId},
    services::{AttemptService, Navigation},
    utils::jwt::Claims,
};

/// DTO for recording one answer.
#[derive(Debug, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_id: QuestionId,
    pub answer: AnswerValue,
}

/// Current state of an attempt session (question pointer, answers, countdown, result).
pub async fn get_session(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = service.view(session_id, claims.learner()?).await?;
    Ok(Json(view))
}

/// Records or replaces the answer to one question.
pub async fn record_answer(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = service
        .record_answer(session_id, claims.learner()?, req.question_id, req.answer)
        .await?;
    Ok(Json(view))
}

/// Moves the question pointer. Out-of-range targets are clamped.
pub async fn navigate(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(nav): Json<Navigation>,
) -> Result<impl IntoResponse, AppError> {
    let view = service.navigate(session_id, claims.learner()?, nav).await?;
    Ok(Json(view))
}

/// Submits the attempt and returns the graded result.
///
/// * Repeated submits return the first result.
/// * If saving fails the result is still returned, with `persistence.status = "failed"`.
pub async fn submit(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = service.submit(session_id, claims.learner()?).await?;
    Ok(Json(result))
}

/// Discards the session without saving anything.
pub async fn abandon(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    service.abandon(session_id, claims.learner()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
