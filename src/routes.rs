use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use axum_macros::debug_handler;

use crate::authentication::{AuthenticatedReviewer, SessionResolver};
use crate::error::ReviewError;
use crate::models::{
    AssignedCourse, FeedbackBody, FeedbackEntry, MessageResponse, PendingFeedback, RespondToRequestBody,
    ReviewRequest, ReviewTopic,
};
use crate::workflow::ReviewWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ReviewWorkflow>,
    pub sessions: Arc<SessionResolver>,
}

impl FromRef<AppState> for Arc<SessionResolver> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/courses-to-review", get(courses_to_review))
        .route("/review-requests", get(review_requests))
        .route("/accept-review-request/:course_id", post(respond_to_review_request))
        .route("/pending-feedbacks/:faculty_id", get(pending_feedbacks))
        .route("/topics-to-review/:course_id", get(topics_to_review))
        .route("/submit-feedback/:file_id", post(submit_feedback))
        .route("/edit-feedback/:file_id", put(edit_feedback))
        .with_state(state)
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse { message: text.to_string() })
}

// Malformed bodies get the same 400 JSON error as any other invalid input,
// instead of axum's plain-text 422.
fn feedback_body(body: Result<Json<FeedbackBody>, JsonRejection>) -> Result<FeedbackBody, ReviewError> {
    body.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(%rejection, "rejected feedback body");
        ReviewError::InvalidInput(rejection.body_text())
    })
}

#[debug_handler(state = AppState)]
async fn courses_to_review(
    State(state): State<AppState>,
    AuthenticatedReviewer(reviewer_id): AuthenticatedReviewer,
) -> Result<Json<Vec<AssignedCourse>>, ReviewError> {
    Ok(Json(state.workflow.courses_to_review(reviewer_id).await?))
}

#[debug_handler(state = AppState)]
async fn review_requests(
    State(state): State<AppState>,
    AuthenticatedReviewer(reviewer_id): AuthenticatedReviewer,
) -> Result<Json<Vec<ReviewRequest>>, ReviewError> {
    Ok(Json(state.workflow.review_requests(reviewer_id).await?))
}

#[debug_handler(state = AppState)]
async fn respond_to_review_request(
    State(state): State<AppState>,
    AuthenticatedReviewer(reviewer_id): AuthenticatedReviewer,
    Path(course_id): Path<i32>,
    body: Result<Json<RespondToRequestBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ReviewError> {
    // a status that isn't a string is just another invalid status
    let Json(body) = body.map_err(|_| ReviewError::InvalidInput("Invalid status".to_string()))?;
    let decision = state
        .workflow
        .respond_to_request(course_id, reviewer_id, &body.status)
        .await?;
    Ok(message(decision.message()))
}

// The faculty id in the path is kept for route compatibility; the worklist is
// always the authenticated reviewer's own.
#[debug_handler(state = AppState)]
async fn pending_feedbacks(
    State(state): State<AppState>,
    AuthenticatedReviewer(reviewer_id): AuthenticatedReviewer,
) -> Result<Json<Vec<PendingFeedback>>, ReviewError> {
    Ok(Json(state.workflow.pending_feedback(reviewer_id).await?))
}

#[debug_handler(state = AppState)]
async fn topics_to_review(
    State(state): State<AppState>,
    AuthenticatedReviewer(_): AuthenticatedReviewer,
    Path(course_id): Path<i32>,
) -> Result<Json<Vec<ReviewTopic>>, ReviewError> {
    Ok(Json(state.workflow.review_topics(course_id).await?))
}

fn entry(file_id: i32, reviewer_id: i32, body: FeedbackBody) -> FeedbackEntry {
    FeedbackEntry {
        file_id,
        reviewer_id,
        course_id: body.course_id,
        feedback_text: body.feedback,
        quality: body.quality,
        rating: body.rating,
    }
}

#[debug_handler(state = AppState)]
async fn submit_feedback(
    State(state): State<AppState>,
    AuthenticatedReviewer(reviewer_id): AuthenticatedReviewer,
    Path(file_id): Path<i32>,
    body: Result<Json<FeedbackBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ReviewError> {
    let body = feedback_body(body)?;
    state.workflow.submit_feedback(entry(file_id, reviewer_id, body)).await?;
    Ok(message("Feedback submitted successfully"))
}

#[debug_handler(state = AppState)]
async fn edit_feedback(
    State(state): State<AppState>,
    AuthenticatedReviewer(reviewer_id): AuthenticatedReviewer,
    Path(file_id): Path<i32>,
    body: Result<Json<FeedbackBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ReviewError> {
    let body = feedback_body(body)?;
    state.workflow.edit_feedback(entry(file_id, reviewer_id, body)).await?;
    Ok(message("Feedback updated successfully"))
}
