// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::quiz::{AssessmentKind, PublicQuiz, QuizId},
    services::{
        AttemptService,
        attempts::{HistoryView, SessionView},
    },
    utils::jwt::Claims,
};

async fn public_assessment(
    service: &AttemptService,
    kind: AssessmentKind,
    id: QuizId,
) -> Result<Json<PublicQuiz>, AppError> {
    let quiz = service
        .store()
        .fetch_assessment(kind, id)
        .await
        .map_err(|e| {
            tracing::debug!("Failed to load {} {}: {}", kind.as_str(), id, e);
            AppError::from(e)
        })?;

    // Map to PublicQuiz to hide the answer key
    Ok(Json(PublicQuiz::from(&quiz)))
}

async fn start_attempt(
    service: &AttemptService,
    claims: &Claims,
    kind: AssessmentKind,
    id: QuizId,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let learner = claims.learner()?;
    let view = service.start(kind, id, learner).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn attempt_history(
    service: &AttemptService,
    claims: &Claims,
    kind: AssessmentKind,
    id: QuizId,
) -> Result<Json<HistoryView>, AppError> {
    let learner = claims.learner()?;
    let history = service.history(kind, id, learner).await?;

    Ok(Json(history))
}

/// Returns a lesson quiz without its answer key.
pub async fn get_quiz(
    State(service): State<AttemptService>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    public_assessment(&service, AssessmentKind::Quiz, id).await
}

/// Starts a new attempt at a lesson quiz.
///
/// * 201 with the session view on success.
/// * 409 with the best prior score when the attempt cap is reached.
pub async fn start_quiz(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    start_attempt(&service, &claims, AssessmentKind::Quiz, id).await
}

/// Attempt history of the current user for a lesson quiz.
pub async fn quiz_history(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    attempt_history(&service, &claims, AssessmentKind::Quiz, id).await
}

pub async fn get_final_test(
    State(service): State<AttemptService>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    public_assessment(&service, AssessmentKind::FinalTest, id).await
}

/// Starts a new attempt at a program/course final test. Same rules as quizzes.
pub async fn start_final_test(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    start_attempt(&service, &claims, AssessmentKind::FinalTest, id).await
}

pub async fn final_test_history(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<QuizId>,
) -> Result<impl IntoResponse, AppError> {
    attempt_history(&service, &claims, AssessmentKind::FinalTest, id).await
}
