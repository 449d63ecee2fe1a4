//! HTTP endpoints for the intake form.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, warn};

use super::form::intake_form;
use super::model::{IntakeReceipt, Submission};
use super::service::IntakeService;
use crate::error::IntakeError;

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub service: Arc<IntakeService>,
}

/// Confirmation line written for every persisted record.
pub fn confirmation(record_id: &str) -> String {
    format!("Custom record created successfully! Internal ID: {record_id}")
}

/// Build the intake routes.
pub fn intake_routes(service: Arc<IntakeService>) -> Router {
    Router::new()
        .route("/intake", get(show_form).post(submit))
        .route("/health", get(health))
        .with_state(IntakeRouteState { service })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inquiry-intake"
    }))
}

/// GET /intake
async fn show_form() -> Html<String> {
    Html(intake_form().render())
}

/// POST /intake
///
/// Parameters are not validated; an unparseable body is treated as a
/// submission with every field absent.
async fn submit(
    State(state): State<IntakeRouteState>,
    form: Result<Form<Submission>, FormRejection>,
) -> Response {
    let submission = match form {
        Ok(Form(submission)) => submission,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable intake body, continuing with empty fields");
            Submission::default()
        }
    };

    into_response(state.service.submit(&submission).await)
}

fn into_response(result: Result<IntakeReceipt, IntakeError>) -> Response {
    match result {
        Ok(receipt) => (StatusCode::OK, confirmation(&receipt.record_id)).into_response(),
        Err(IntakeError::Mail {
            record_id,
            failures,
        }) => {
            for failure in &failures {
                error!(record_id = %record_id, error = %failure, "Notification failed");
            }
            (
                StatusCode::ACCEPTED,
                format!(
                    "{}\nNotification delivery failed.",
                    confirmation(&record_id)
                ),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Unexpected error occurred");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The inquiry could not be recorded.",
            )
                .into_response()
        }
    }
}
