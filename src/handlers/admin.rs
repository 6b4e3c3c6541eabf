// src/handlers/admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{AssessmentKind, CreateAssessmentRequest},
    services::AttemptService,
};

async fn create_assessment(
    service: &AttemptService,
    kind: AssessmentKind,
    payload: CreateAssessmentRequest,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = service
        .store()
        .save_assessment(payload.into_quiz(kind))
        .await
        .map_err(|e| {
            tracing::error!("Failed to create {}: {:?}", kind.as_str(), e);
            AppError::from(e)
        })?;

    tracing::info!(
        "Created {} {} with {} questions",
        kind.as_str(),
        quiz.id,
        quiz.questions.len()
    );

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": quiz.id }))))
}

/// Creates a lesson quiz.
/// Admin only.
pub async fn create_quiz(
    State(service): State<AttemptService>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_assessment(&service, AssessmentKind::Quiz, payload).await
}

/// Creates a program/course final test.
/// Admin only.
pub async fn create_final_test(
    State(service): State<AttemptService>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_assessment(&service, AssessmentKind::FinalTest, payload).await
}
