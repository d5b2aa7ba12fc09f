// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway API.
//!
//! Handles POST /v1/tick, POST /v1/events, POST /v1/enrollments, GET /health.

use std::str::FromStr;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::error;

use cadence_core::types::{DeliveryEvent, EventType};
use cadence_core::CadenceError;
use cadence_identity::RawContact;
use cadence_reconcile::ReconcileOutcome;

use crate::server::GatewayState;

/// Request body for POST /v1/events (webhook-style provider callback).
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Provider-supplied idempotency key.
    pub event_id: String,
    /// One of `accepted`, `replied`, `bounced`, `message_received`.
    pub event_type: String,
    /// Sending account the event belongs to.
    pub account_ref: String,
    /// Provider reference of the originating send, if known.
    #[serde(default)]
    pub provider_ref: Option<String>,
    /// Prospect id, when the provider can name it directly.
    #[serde(default)]
    pub prospect_id: Option<String>,
    /// Raw provider payload, stored for audit.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// When the event happened at the provider. Defaults to receipt time.
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<Utc>>,
}

/// Response body for POST /v1/events.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// `applied`, `duplicate`, or `unmatched`.
    pub outcome: String,
}

/// Request body for POST /v1/enrollments: import one contact into a campaign.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub workspace_id: String,
    pub campaign_id: String,
    pub contact: ContactBody,
}

/// One raw contact as imported.
#[derive(Debug, Default, Deserialize)]
pub struct ContactBody {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Response body for POST /v1/enrollments.
#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub prospect_id: String,
    /// Whether this import created the prospect (false = deduplicated).
    pub is_new: bool,
    pub enrollment_id: String,
    /// Queue items created by schedule computation.
    pub queued: u64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// POST /v1/tick
///
/// Runs one dispatcher pass and returns the summary. Idempotent in the sense
/// required of a trigger endpoint: an empty queue is a no-op, and concurrent
/// invocations arbitrate through the queue's atomic claim.
pub async fn post_tick(State(state): State<GatewayState>) -> Response {
    let now = Utc::now();
    let mut rng = StdRng::from_entropy();

    match state.dispatcher.tick(now, &mut rng).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!(error = %e, "tick failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /v1/events
///
/// Ingests one provider event. Safely replayable: a repeated event id
/// returns `duplicate` and changes nothing.
pub async fn post_events(
    State(state): State<GatewayState>,
    Json(body): Json<EventRequest>,
) -> Response {
    let Ok(event_type) = EventType::from_str(&body.event_type) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: format!("unknown event_type `{}`", body.event_type),
            }),
        )
            .into_response();
    };

    let event = DeliveryEvent {
        event_id: body.event_id,
        event_type,
        account_ref: body.account_ref,
        provider_ref: body.provider_ref,
        prospect_id: body.prospect_id,
        payload: body.payload,
        occurred_at: body.timestamp.unwrap_or_else(Utc::now),
    };

    let mut rng = StdRng::from_entropy();
    match state.reconciler.on_event(&event, &mut rng).await {
        Ok(outcome) => {
            let outcome = match outcome {
                ReconcileOutcome::Applied => "applied",
                ReconcileOutcome::Duplicate => "duplicate",
                ReconcileOutcome::Unmatched => "unmatched",
            };
            (
                StatusCode::OK,
                Json(EventResponse {
                    outcome: outcome.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "event reconciliation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /v1/enrollments
///
/// Resolves the contact (dedup across imports), admits it into the campaign,
/// and computes its send schedule from the campaign start date. Identity and
/// enrollment conflicts surface as 409; they are caller decisions, never
/// auto-resolved.
pub async fn post_enrollments(
    State(state): State<GatewayState>,
    Json(body): Json<EnrollRequest>,
) -> Response {
    let raw = RawContact {
        display_name: body.contact.display_name,
        email: body.contact.email,
        profile_url: body.contact.profile_url,
        title: body.contact.title,
        company: body.contact.company,
    };

    let resolution = match state.resolver.resolve(&body.workspace_id, &raw).await {
        Ok(resolution) => resolution,
        Err(e) => return enroll_error(e),
    };

    let enrollment = match state
        .resolver
        .enroll(&resolution.prospect_id, &body.campaign_id)
        .await
    {
        Ok(enrollment) => enrollment,
        Err(e) => return enroll_error(e),
    };

    let campaign = match state.storage.get_campaign(&body.campaign_id).await {
        Ok(Some(campaign)) => campaign,
        Ok(None) => {
            return enroll_error(CadenceError::NotFound {
                entity: "campaign",
                id: body.campaign_id,
            })
        }
        Err(e) => return enroll_error(e),
    };

    let mut rng = StdRng::from_entropy();
    let queued = match state
        .scheduler
        .schedule_enrollment(
            &body.campaign_id,
            &resolution.prospect_id,
            campaign.start_date,
            0,
            &mut rng,
        )
        .await
    {
        Ok(queued) => queued,
        Err(e) => return enroll_error(e),
    };

    (
        StatusCode::OK,
        Json(EnrollResponse {
            prospect_id: resolution.prospect_id,
            is_new: resolution.is_new,
            enrollment_id: enrollment.id,
            queued,
        }),
    )
        .into_response()
}

fn enroll_error(e: CadenceError) -> Response {
    let status = match &e {
        CadenceError::IdentityConflict { .. } | CadenceError::EnrollmentConflict { .. } => {
            StatusCode::CONFLICT
        }
        CadenceError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CadenceError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "enrollment failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// GET /health
///
/// Unauthenticated liveness endpoint.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_dispatch::TickSummary;

    #[test]
    fn event_request_deserializes_minimal_body() {
        let json = r#"{
            "event_id": "evt-1",
            "event_type": "replied",
            "account_ref": "acct-1"
        }"#;
        let req: EventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.event_id, "evt-1");
        assert_eq!(req.event_type, "replied");
        assert!(req.provider_ref.is_none());
        assert!(req.timestamp.is_none());
    }

    #[test]
    fn event_request_deserializes_full_body() {
        let json = r#"{
            "event_id": "evt-2",
            "event_type": "accepted",
            "account_ref": "acct-1",
            "provider_ref": "inv-42",
            "prospect_id": "p-1",
            "payload": {"source": "webhook"},
            "timestamp": "2024-01-03T18:00:00Z"
        }"#;
        let req: EventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.provider_ref.as_deref(), Some("inv-42"));
        assert!(req.timestamp.is_some());
    }

    #[test]
    fn unknown_event_type_fails_parsing() {
        assert!(EventType::from_str("poked").is_err());
        assert_eq!(
            EventType::from_str("message_received").unwrap(),
            EventType::MessageReceived
        );
    }

    #[test]
    fn enroll_request_deserializes_sparse_contact() {
        let json = r#"{
            "workspace_id": "ws-1",
            "campaign_id": "c-1",
            "contact": {"email": "jane@example.com"}
        }"#;
        let req: EnrollRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.contact.email.as_deref(), Some("jane@example.com"));
        assert!(req.contact.profile_url.is_none());
    }

    #[test]
    fn tick_summary_serializes_counts() {
        let summary = TickSummary {
            attempted: 5,
            sent: 3,
            deferred: 1,
            failed: 1,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"attempted\":5"));
        assert!(json.contains("\"sent\":3"));
        assert!(json.contains("\"deferred\":1"));
        assert!(json.contains("\"failed\":1"));
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("something went wrong"));
    }
}
