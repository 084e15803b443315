//! Axum-based HTTP gateway for the authentication settings surface.
//!
//! Endpoints mirror what the settings frontend consumes:
//! - `GET  /api/system/multi-user-mode` — is multi-user mode active
//! - `GET  /api/system/settings` — current mode + whether auth is required
//! - `POST /api/system/setup-multi-user` — enable multi-user with a bootstrap admin
//! - `POST /api/system/update-password` — toggle shared-password protection
//! - `POST /api/request-token` — exchange credentials for a session token
//!
//! Transition failures come back as `{success: false, error}` so the
//! client can show the message and keep the operator's form input; the
//! perceived mode never changes on failure. On success the client must
//! drop its cached identity, token, and auth timestamp before issuing
//! any further request — the old session is being revoked server-side.
//!
//! Hardening as elsewhere in the stack: request body size limit, request
//! timeout, CORS layer, loopback-only bind unless explicitly opted out.

use crate::auth::{
    AuthError, AuthMode, AuthModeStore, ConfigQuery, CredentialBootstrapper,
    ModeTransitionController,
};
use crate::config::Settings;
use crate::session::{SessionInvalidator, SessionStore, TokenSessionInvalidator};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (16KB) — settings payloads are tiny.
pub const MAX_BODY_SIZE: usize = 16_384;
/// Request timeout (30s) — covers deliberately slow credential hashing.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub query: ConfigQuery,
    pub controller: Arc<ModeTransitionController>,
    pub store: Arc<AuthModeStore>,
    pub sessions: Arc<SessionStore>,
    /// Concrete invalidator, kept here so a serving layer can subscribe
    /// to re-authentication signals for connected clients.
    pub invalidator: Arc<TokenSessionInvalidator>,
}

impl AppState {
    /// Open the stores and wire up the components from settings.
    pub fn initialize(settings: &Settings) -> Result<Self> {
        let db_path = settings.db_path()?;
        let store = Arc::new(AuthModeStore::open(&db_path)?);
        let sessions = Arc::new(SessionStore::open(
            &db_path,
            Some(settings.session_ttl_secs),
        )?);
        let invalidator = Arc::new(TokenSessionInvalidator::new(Arc::clone(&sessions)));
        let controller = Arc::new(ModeTransitionController::new(
            Arc::clone(&store),
            CredentialBootstrapper::new(settings.hash_iterations),
            Arc::clone(&invalidator) as Arc<dyn SessionInvalidator>,
        ));
        Ok(Self {
            query: ConfigQuery::new(Arc::clone(&store)),
            controller,
            store,
            sessions,
            invalidator,
        })
    }
}

/// Build the gateway router with all layers applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/system/multi-user-mode", get(multi_user_mode))
        .route("/api/system/settings", get(system_settings))
        .route("/api/system/setup-multi-user", post(setup_multi_user))
        .route("/api/system/update-password", post(update_password))
        .route("/api/request-token", post(request_token))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP gateway.
pub async fn run_gateway(settings: Settings) -> Result<()> {
    let state = AppState::initialize(&settings)?;

    // Refuse public bind while the instance requires no authentication,
    // unless the operator explicitly opted in.
    let host = settings.gateway.host.as_str();
    if is_public_bind(host)
        && !settings.gateway.allow_public_bind
        && !state.query.describe()?.requires_auth
    {
        anyhow::bail!(
            "refusing to bind to {host} with authentication disabled.\n\
             Fix: use host = \"127.0.0.1\" (default), enable authentication first, or set\n\
             [gateway] allow_public_bind = true in config.toml (NOT recommended)."
        );
    }

    let addr: SocketAddr = format!("{host}:{}", settings.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual = listener.local_addr()?;
    tracing::info!(addr = %actual, "Gateway listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// True for bind addresses reachable from other machines.
fn is_public_bind(host: &str) -> bool {
    !matches!(host, "127.0.0.1" | "localhost" | "::1")
}

// ── Wire shapes ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiUserModeResponse {
    multi_user_mode: bool,
}

#[derive(Debug, Serialize)]
struct TransitionOutcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TransitionOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(err: &AuthError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetupMultiUserBody {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordBody {
    use_password: bool,
    new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestTokenBody {
    username: Option<String>,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ── Handlers ────────────────────────────────────────────────────────

async fn multi_user_mode(State(state): State<AppState>) -> impl IntoResponse {
    match state.query.is_multi_user_mode() {
        Ok(enabled) => Json(MultiUserModeResponse {
            multi_user_mode: enabled,
        })
        .into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn system_settings(State(state): State<AppState>) -> impl IntoResponse {
    match state.query.describe() {
        Ok(desc) => Json(desc).into_response(),
        Err(e) => internal_error(&e),
    }
}

async fn setup_multi_user(
    State(state): State<AppState>,
    Json(body): Json<SetupMultiUserBody>,
) -> Json<TransitionOutcome> {
    let controller = Arc::clone(&state.controller);
    // PBKDF2 stretching is CPU-bound; keep it off the reactor.
    let result = tokio::task::spawn_blocking(move || {
        controller.enable_multi_user(&body.username, &body.password)
    })
    .await
    .map_err(|e| AuthError::backend(e.to_string()))
    .and_then(|r| r);

    match result {
        Ok(_) => Json(TransitionOutcome::ok()),
        Err(e) => {
            tracing::warn!(error = %e, "Multi-user setup rejected");
            Json(TransitionOutcome::failed(&e))
        }
    }
}

async fn update_password(
    State(state): State<AppState>,
    Json(body): Json<UpdatePasswordBody>,
) -> Json<TransitionOutcome> {
    let controller = Arc::clone(&state.controller);
    let result = tokio::task::spawn_blocking(move || {
        controller.set_password_protection(body.use_password, body.new_password.as_deref())
    })
    .await
    .map_err(|e| AuthError::backend(e.to_string()))
    .and_then(|r| r);

    match result {
        Ok(_) => Json(TransitionOutcome::ok()),
        Err(e) => {
            tracing::warn!(error = %e, "Password protection update rejected");
            Json(TransitionOutcome::failed(&e))
        }
    }
}

async fn request_token(
    State(state): State<AppState>,
    Json(body): Json<RequestTokenBody>,
) -> Json<TokenResponse> {
    let store = Arc::clone(&state.store);
    let sessions = Arc::clone(&state.sessions);

    let result = tokio::task::spawn_blocking(move || issue_token(&store, &sessions, &body))
        .await
        .unwrap_or_else(|e| Err(AuthError::backend(e.to_string())));

    match result {
        Ok(token) => Json(TokenResponse {
            success: true,
            token: Some(token),
            error: None,
        }),
        Err(e) => Json(TokenResponse {
            success: false,
            token: None,
            error: Some(e.to_string()),
        }),
    }
}

/// Credential check + token issuance for the current mode.
fn issue_token(
    store: &AuthModeStore,
    sessions: &SessionStore,
    body: &RequestTokenBody,
) -> Result<String, AuthError> {
    let config = store.read()?;
    match config.mode {
        AuthMode::Disabled => Err(AuthError::validation("authentication is disabled")),
        AuthMode::PasswordProtected => {
            let hash = config
                .password_hash
                .as_ref()
                .ok_or_else(|| AuthError::backend("missing instance password hash"))?;
            if !hash.verify(&body.password) {
                return Err(AuthError::validation("invalid credentials"));
            }
            sessions.issue("instance")
        }
        AuthMode::MultiUser => {
            let username = body
                .username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| AuthError::validation("username is required"))?;

            let account = config
                .admin_accounts
                .iter()
                .find(|a| a.username.eq_ignore_ascii_case(username));

            // Same error for unknown user and wrong password.
            match account {
                Some(account) if account.credential.verify(&body.password) => {
                    sessions.issue(&account.username)
                }
                _ => Err(AuthError::validation("invalid credentials")),
            }
        }
    }
}

fn internal_error(err: &AuthError) -> axum::response::Response {
    tracing::error!(error = %err, "Gateway query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let tmp = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            data_dir: Some(tmp.path().to_path_buf()),
            hash_iterations: 10,
            ..Settings::default()
        };
        let state = AppState::initialize(&settings).unwrap();
        (tmp, state)
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(router: &Router, uri: &str, body: serde_json::Value) -> serde_json::Value {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn fresh_instance_reports_no_auth() {
        let (_tmp, state) = test_state();
        let app = router(state);

        let (status, body) = get_json(&app, "/api/system/multi-user-mode").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["multiUserMode"], false);

        let (_, body) = get_json(&app, "/api/system/settings").await;
        assert_eq!(body["requiresAuth"], false);
        assert_eq!(body["mode"], "disabled");
    }

    #[tokio::test]
    async fn setup_multi_user_flips_the_mode() {
        let (_tmp, state) = test_state();
        let app = router(state);

        let body = post_json(
            &app,
            "/api/system/setup-multi-user",
            serde_json::json!({"username": "admin", "password": "password123"}),
        )
        .await;
        assert_eq!(body["success"], true);
        assert!(body.get("error").is_none());

        let (_, body) = get_json(&app, "/api/system/multi-user-mode").await;
        assert_eq!(body["multiUserMode"], true);

        let (_, body) = get_json(&app, "/api/system/settings").await;
        assert_eq!(body["requiresAuth"], true);
        assert_eq!(body["mode"], "multi_user");
    }

    #[tokio::test]
    async fn second_bootstrap_is_rejected() {
        let (_tmp, state) = test_state();
        let app = router(state);

        post_json(
            &app,
            "/api/system/setup-multi-user",
            serde_json::json!({"username": "admin", "password": "password123"}),
        )
        .await;

        let body = post_json(
            &app,
            "/api/system/setup-multi-user",
            serde_json::json!({"username": "intruder", "password": "password456"}),
        )
        .await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("multi-user"));
    }

    #[tokio::test]
    async fn short_password_is_rejected_with_message() {
        let (_tmp, state) = test_state();
        let app = router(state.clone());

        let body = post_json(
            &app,
            "/api/system/update-password",
            serde_json::json!({"usePassword": true, "newPassword": "short"}),
        )
        .await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("8 characters"));

        // Mode unchanged.
        assert!(!state.query.describe().unwrap().requires_auth);
    }

    #[tokio::test]
    async fn password_protection_toggles_and_issues_tokens() {
        let (_tmp, state) = test_state();
        let app = router(state.clone());

        let body = post_json(
            &app,
            "/api/system/update-password",
            serde_json::json!({"usePassword": true, "newPassword": "instance-pass"}),
        )
        .await;
        assert_eq!(body["success"], true);

        // Wrong password: no token.
        let body = post_json(
            &app,
            "/api/request-token",
            serde_json::json!({"password": "wrong-password"}),
        )
        .await;
        assert_eq!(body["success"], false);

        // Right password: token validates.
        let body = post_json(
            &app,
            "/api/request-token",
            serde_json::json!({"password": "instance-pass"}),
        )
        .await;
        assert_eq!(body["success"], true);
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(state.sessions.validate(&token).unwrap().principal, "instance");

        // Turning protection off revokes the session.
        let body = post_json(
            &app,
            "/api/system/update-password",
            serde_json::json!({"usePassword": false}),
        )
        .await;
        assert_eq!(body["success"], true);
        assert!(state.sessions.validate(&token).is_none());

        let (_, body) = get_json(&app, "/api/system/settings").await;
        assert_eq!(body["requiresAuth"], false);
    }

    #[tokio::test]
    async fn multi_user_login_issues_admin_token() {
        let (_tmp, state) = test_state();
        let app = router(state.clone());

        post_json(
            &app,
            "/api/system/setup-multi-user",
            serde_json::json!({"username": "admin", "password": "password123"}),
        )
        .await;

        // Username is matched case-insensitively; password must be exact.
        let body = post_json(
            &app,
            "/api/request-token",
            serde_json::json!({"username": "Admin", "password": "password123"}),
        )
        .await;
        assert_eq!(body["success"], true);
        let token = body["token"].as_str().unwrap();
        assert_eq!(state.sessions.validate(token).unwrap().principal, "admin");

        let body = post_json(
            &app,
            "/api/request-token",
            serde_json::json!({"username": "admin", "password": "wrong-password"}),
        )
        .await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "invalid credentials");
    }

    #[tokio::test]
    async fn request_token_needs_username_in_multi_user_mode() {
        let (_tmp, state) = test_state();
        let app = router(state);

        post_json(
            &app,
            "/api/system/setup-multi-user",
            serde_json::json!({"username": "admin", "password": "password123"}),
        )
        .await;

        let body = post_json(
            &app,
            "/api/request-token",
            serde_json::json!({"password": "password123"}),
        )
        .await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("username"));
    }

    #[tokio::test]
    async fn transition_broadcasts_reauth_signal() {
        let (_tmp, state) = test_state();
        let mut rx = state.invalidator.subscribe();
        let app = router(state);

        post_json(
            &app,
            "/api/system/setup-multi-user",
            serde_json::json!({"username": "admin", "password": "password123"}),
        )
        .await;

        let reason = rx.try_recv().unwrap();
        assert_eq!(reason, crate::session::InvalidationReason::ModeEscalated);
    }

    #[test]
    fn loopback_hosts_are_not_public() {
        assert!(!is_public_bind("127.0.0.1"));
        assert!(!is_public_bind("localhost"));
        assert!(!is_public_bind("::1"));
        assert!(is_public_bind("0.0.0.0"));
        assert!(is_public_bind("192.168.1.10"));
    }
}
