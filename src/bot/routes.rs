//! REST endpoints for health, rendered menus, and session snapshots.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::FunnelConfig;
use crate::funnel::{IntakeState, Screen, Session, menu};

use super::sessions::SessionStore;

/// Shared state for status routes.
#[derive(Clone)]
pub struct StatusState {
    pub config: Arc<FunnelConfig>,
    pub sessions: Arc<SessionStore>,
}

/// Session progress without the customer's contact details.
#[derive(Debug, Serialize)]
struct SessionSummary {
    state: IntakeState,
    collecting: bool,
    pending_package: Option<String>,
    pending_total: Option<Decimal>,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            state: session.state,
            collecting: session.state.is_collecting(),
            pending_package: session.pending_package,
            pending_total: session.pending_total,
        }
    }
}

async fn health(State(state): State<StatusState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.len().await,
    }))
}

/// GET /api/funnel/menu/{screen}
///
/// Returns the rendered screen: text plus buttons.
async fn get_menu(
    State(state): State<StatusState>,
    Path(screen): Path<String>,
) -> impl IntoResponse {
    match Screen::parse(&screen) {
        Some(screen) => Json(menu::render(&state.config, screen)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("Unknown screen: {screen}")})),
        )
            .into_response(),
    }
}

/// GET /api/funnel/sessions/{id}
///
/// Returns where the session is in the funnel, or 404. Email, phone and
/// payment note never leave the process through this route.
async fn get_session(
    State(state): State<StatusState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.snapshot(&id).await {
        Some(session) => Json(SessionSummary::from(session)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No such session"})),
        )
            .into_response(),
    }
}

/// Build the status routes. Only the public catalog routes allow
/// cross-origin reads.
pub fn status_routes(state: StatusState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/funnel/menu/{screen}", get(get_menu))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/api/funnel/sessions/{id}", get(get_session))
        .merge(public)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    use super::*;

    fn app() -> (Router, Arc<SessionStore>) {
        let sessions = SessionStore::new();
        let state = StatusState {
            config: Arc::new(FunnelConfig::default()),
            sessions: Arc::clone(&sessions),
        };
        (status_routes(state), sessions)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = get_from(app, uri, "https://shop.example").await;
        (status, body)
    }

    /// GET with an `Origin` header; also returns the CORS allow-origin header.
    async fn get_from(
        app: Router,
        uri: &str,
        origin: &str,
    ) -> (StatusCode, Option<String>, serde_json::Value) {
        let request = Request::builder()
            .uri(uri)
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let allow_origin = resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, allow_origin, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app();
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn menu_renders_known_screen() {
        let (app, _) = app();
        let (status, body) = get_json(app, "/api/funnel/menu/contact").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["menu"][0]["action_id"], "order_contact");
        assert!(body["text"].as_str().unwrap().contains("@kyvarion"));
    }

    #[tokio::test]
    async fn menu_unknown_screen_is_404() {
        let (app, _) = app();
        let (status, _) = get_json(app, "/api/funnel/menu/settings").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_snapshot() {
        let (app, sessions) = app();
        sessions
            .get_or_create("cli:local-user")
            .await
            .lock()
            .await
            .begin_order("Contact", None);

        let (status, body) = get_json(app.clone(), "/api/funnel/sessions/cli:local-user").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "await_email");
        assert_eq!(body["pending_package"], "Contact");
        assert!(body["pending_total"].is_null());
        assert_eq!(body["collecting"], true);

        let (status, _) = get_json(app, "/api/funnel/sessions/nobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_snapshot_hides_contact_details() {
        let (app, sessions) = app();
        {
            let session = sessions.get_or_create("telegram:42").await;
            let mut session = session.lock().await;
            session.begin_order("Gold", Some(dec!(450)));
            session.submit("victim@example.com");
            session.submit("+1 555 123 4567");
        }

        let (status, allow_origin, body) =
            get_from(app, "/api/funnel/sessions/telegram:42", "https://evil.example").await;
        assert_eq!(status, StatusCode::OK);
        assert!(allow_origin.is_none());
        assert_eq!(body["state"], "await_payment_note");
        assert_eq!(body["pending_total"], "450");

        let fields = body.as_object().unwrap();
        for hidden in ["email", "phone", "payment_note"] {
            assert!(!fields.contains_key(hidden), "{hidden} exposed");
        }
        let raw = body.to_string();
        assert!(!raw.contains("victim@example.com"));
        assert!(!raw.contains("555 123 4567"));
    }

    #[tokio::test]
    async fn menu_allows_cross_origin_reads() {
        let (app, _) = app();
        let (status, allow_origin, _) =
            get_from(app, "/api/funnel/menu/main", "https://shop.example").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(allow_origin.as_deref(), Some("*"));
    }
}
