//! Slack-facing HTTP endpoints.
//!
//! Every request is signature-checked against the raw body before it is
//! decoded. Interactions are acknowledged as soon as they decode and are
//! dispatched on their own task, since Slack gives the endpoint three seconds
//! and gif, quote and profile lookups can take longer. The router reports
//! dispatch failures to the user itself, so the acknowledgement is always 200.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use simba_db::DbPool;
use simba_slack::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use simba_slack::{
    parse_event, parse_interaction_form, EventContext, EventRouter, HandlerResult,
    InteractionRouter, SignatureVerifier,
};

use crate::health;
use crate::service::MoodService;

#[derive(Clone)]
pub struct AppState {
    pub interactions: Arc<InteractionRouter<MoodService>>,
    pub events: Arc<EventRouter<MoodService>>,
    pub verifier: SignatureVerifier,
}

impl AppState {
    pub fn new(service: MoodService, verifier: SignatureVerifier) -> Self {
        Self {
            interactions: Arc::new(InteractionRouter::new(service.clone())),
            events: Arc::new(EventRouter::new(service)),
            verifier,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    correlation_id: String,
}

pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .route("/slack/interactive", post(interactive))
        .with_state(state)
        .merge(health::router(db_pool))
}

fn reject(status: StatusCode, error: impl ToString, ctx: &EventContext) -> Response {
    let body = ErrorBody { error: error.to_string(), correlation_id: ctx.correlation_id.clone() };
    (status, Json(body)).into_response()
}

fn verify(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    ctx: &EventContext,
) -> Result<(), Response> {
    let header_value = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let timestamp = header_value(TIMESTAMP_HEADER);
    let signature = header_value(SIGNATURE_HEADER);
    state.verifier.verify(timestamp, signature, body, Utc::now().timestamp()).map_err(|error| {
        warn!(
            event_name = "slack.request.rejected",
            correlation_id = %ctx.correlation_id,
            error = %error,
            "signature verification failed"
        );
        reject(StatusCode::UNAUTHORIZED, error, ctx)
    })
}

fn request_context() -> EventContext {
    EventContext { correlation_id: Uuid::new_v4().to_string() }
}

async fn events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = request_context();
    if let Err(rejection) = verify(&state, &headers, &body, &ctx) {
        return rejection;
    }

    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(error) => return reject(StatusCode::BAD_REQUEST, error, &ctx),
    };

    match state.events.dispatch(&event, &ctx).await {
        Ok(HandlerResult::Challenge(challenge)) => {
            ([(header::CONTENT_TYPE, "text/plain")], challenge).into_response()
        }
        Ok(result) => {
            debug!(
                event_name = "slack.event.handled",
                correlation_id = %ctx.correlation_id,
                ?result
            );
            StatusCode::OK.into_response()
        }
        Err(error) => {
            warn!(
                event_name = "slack.event.failed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "event handler failed"
            );
            StatusCode::OK.into_response()
        }
    }
}

async fn interactive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = request_context();
    if let Err(rejection) = verify(&state, &headers, &body, &ctx) {
        return rejection;
    }

    let interaction = match parse_interaction_form(&body) {
        Ok(interaction) => interaction,
        Err(error) => return reject(StatusCode::BAD_REQUEST, error, &ctx),
    };

    let router = Arc::clone(&state.interactions);
    tokio::spawn(async move {
        if let Ok(result) = router.dispatch(&interaction, &ctx).await {
            debug!(
                event_name = "slack.interaction.handled",
                correlation_id = %ctx.correlation_id,
                ?result
            );
        }
    });
    StatusCode::OK.into_response()
}
