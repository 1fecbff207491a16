//! HTTP handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::debug;

use scalebridge_registry::ApplyOutcome;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Query parameters of an update submission.
///
/// Everything is taken as text so parse failures can be reported per
/// parameter instead of as a generic extractor rejection.
#[derive(Debug, Default)]
pub struct EventParams {
    pub name: Option<String>,
    pub active: Option<String>,
    pub value: Option<String>,
}

impl EventParams {
    /// Collect parameters from decoded query pairs. A repeated key keeps
    /// its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, val) in pairs {
            let slot = match key.as_str() {
                "name" => &mut params.name,
                "active" => &mut params.active,
                "value" => &mut params.value,
                _ => continue,
            };
            slot.get_or_insert(val);
        }
        params
    }
}

/// Body of a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResult {
    pub outcome: &'static str,
    pub applied: bool,
}

impl From<ApplyOutcome> for SubmitResult {
    fn from(outcome: ApplyOutcome) -> Self {
        Self {
            outcome: outcome.label(),
            applied: outcome.is_applied(),
        }
    }
}

/// ANY /?name=&active=&value=
///
/// Returns 200 once the event is applied. An event for an object with no
/// open stream is discarded but still answered with 200; the body reports
/// `"outcome": "unregistered"`.
pub async fn submit_event(
    State(state): State<ApiState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let params = EventParams::from_pairs(pairs);
    match state.ingestor.submit(
        params.name.as_deref(),
        params.active.as_deref(),
        params.value.as_deref(),
    ) {
        Ok(outcome) => {
            debug!(
                object = params.name.as_deref().unwrap_or_default(),
                outcome = outcome.label(),
                "event accepted"
            );
            ApiResponse::ok(SubmitResult::from(outcome)).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response(),
    }
}
