//! HTTP surface: the protected tool endpoint, the login round trip, health
//!
//! Every authentication strategy plugs in behind the same middleware; the
//! dispatcher never sees an unauthenticated request. Auth rejections map to
//! 401 (503 when the auth subsystem itself is down) with a machine-readable
//! body; in session mode the body also names the login endpoint.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use recordgate_auth::{
    AuthError, AuthErrorKind, AuthRequest, Authenticator, JwtAuthenticator, KeyStore,
    MemorySessionStore, OAuthFlow, SessionAuthenticator, SessionStore, StaticKeyAuthenticator,
};
use recordgate_protocol::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ResponseId};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{AuthMode, ServerConfig};
use crate::dispatch::ToolDispatcher;
use crate::records::CsvRecordStore;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "recordgate_session";

/// Path of the login endpoint, advertised in session-mode rejections
pub const LOGIN_PATH: &str = "/auth/login";

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    authenticator: Arc<dyn Authenticator>,
    dispatcher: ToolDispatcher,
    oauth: Option<Arc<OAuthFlow<MemorySessionStore>>>,
    sessions: Option<Arc<MemorySessionStore>>,
}

impl AppState {
    /// State for bearer-style modes (static key, JWT): no login endpoints
    pub fn new(authenticator: Arc<dyn Authenticator>, dispatcher: ToolDispatcher) -> Self {
        Self {
            authenticator,
            dispatcher,
            oauth: None,
            sessions: None,
        }
    }

    /// State for session mode: login endpoints are mounted
    pub fn with_oauth(
        authenticator: Arc<dyn Authenticator>,
        dispatcher: ToolDispatcher,
        oauth: Arc<OAuthFlow<MemorySessionStore>>,
        sessions: Arc<MemorySessionStore>,
    ) -> Self {
        Self {
            authenticator,
            dispatcher,
            oauth: Some(oauth),
            sessions: Some(sessions),
        }
    }

    /// Assemble state from loaded configuration
    pub fn from_config(config: ServerConfig) -> Result<Self, AuthError> {
        let dispatcher = ToolDispatcher::new(Arc::new(CsvRecordStore::new(config.csv_path)));

        match config.auth {
            AuthMode::StaticKey { api_key } => Ok(Self::new(
                Arc::new(StaticKeyAuthenticator::new(api_key)),
                dispatcher,
            )),
            AuthMode::SessionOAuth { oauth, session_ttl } => {
                let sessions = Arc::new(MemorySessionStore::new(session_ttl));
                let flow = Arc::new(OAuthFlow::new(oauth, Arc::clone(&sessions))?);
                let authenticator =
                    Arc::new(SessionAuthenticator::new(Arc::clone(&sessions), LOGIN_PATH));
                Ok(Self::with_oauth(authenticator, dispatcher, flow, sessions))
            }
            AuthMode::JwksJwt { jwks_url, issuer } => {
                let store = Arc::new(KeyStore::new(jwks_url)?);
                let mut authenticator = JwtAuthenticator::new(store);
                if let Some(issuer) = issuer {
                    authenticator = authenticator.with_issuer(issuer);
                }
                Ok(Self::new(Arc::new(authenticator), dispatcher))
            }
        }
    }

    fn login_hint(&self) -> Option<&'static str> {
        self.oauth.as_ref().map(|_| LOGIN_PATH)
    }
}

/// Build the full router for the given state
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/mcp",
            post(invoke).layer(middleware::from_fn_with_state(
                state.clone(),
                require_auth,
            )),
        )
        .route("/health", get(health));

    if state.oauth.is_some() {
        router = router
            .route(LOGIN_PATH, get(login))
            .route("/auth/callback", get(callback));
    }

    router.with_state(state)
}

/// Authentication middleware in front of the tool endpoint
async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let auth_request = AuthRequest {
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        session_cookie: session_id_from(request.headers()),
    };

    match state.authenticator.authenticate(&auth_request).await {
        Ok(ctx) => {
            debug!(subject = %ctx.subject, provider = %ctx.provider, "request authenticated");
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => rejection(&err, state.login_hint()),
    }
}

/// The tool endpoint: parse the envelope, dispatch, answer
async fn invoke(State(state): State<AppState>, body: String) -> Json<JsonRpcResponse> {
    let response = match serde_json::from_str::<JsonRpcRequest>(&body) {
        Ok(request) => state.dispatcher.dispatch(request),
        Err(e) => {
            // Valid JSON that is not a request envelope is an invalid
            // request; anything else is a parse error. Both answer id null.
            let code = if serde_json::from_str::<Value>(&body).is_ok() {
                error_codes::INVALID_REQUEST
            } else {
                error_codes::PARSE_ERROR
            };
            debug!(error = %e, code, "unparseable request body");
            JsonRpcResponse::error(
                ResponseId::null(),
                JsonRpcError::new(code, "invalid request body"),
            )
        }
    };
    Json(response)
}

/// Start the login round trip: park state, redirect to the provider
async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (Some(oauth), Some(sessions)) = (&state.oauth, &state.sessions) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // Reuse a live session when the browser already carries one.
    let session_id = match session_id_from(&headers) {
        Some(id) => {
            if sessions.load(&id).await.is_some() {
                id
            } else {
                sessions.create().await
            }
        }
        None => sessions.create().await,
    };

    let url = match oauth.login(&session_id).await {
        Ok(url) => url,
        Err(err) => return rejection(&err, state.login_hint()),
    };

    let cookie = HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax"
    ));
    let location = HeaderValue::from_str(url.as_str());
    match (cookie, location) {
        (Ok(cookie), Ok(location)) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(header::LOCATION, location);
            response.headers_mut().append(header::SET_COOKIE, cookie);
            response
        }
        (cookie, location) => {
            warn!(
                cookie_ok = cookie.is_ok(),
                location_ok = location.is_ok(),
                "unusable redirect header value"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

/// Finish the login round trip: match state, exchange the code
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(oauth) = &state.oauth else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(session_id) = session_id_from(&headers) else {
        return rejection(&AuthError::Required, state.login_hint());
    };

    match oauth.callback(&session_id, &query.code, &query.state).await {
        Ok(()) => Json(json!({ "status": "authenticated" })).into_response(),
        Err(err) => rejection(&err, state.login_hint()),
    }
}

/// Unauthenticated liveness endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Map an auth rejection to its transport response
fn rejection(err: &AuthError, login: Option<&'static str>) -> Response {
    let status = match err.kind() {
        AuthErrorKind::AuthUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::UNAUTHORIZED,
    };

    let mut body = json!({
        "error": {
            "kind": err.kind().as_str(),
            "message": err.to_string(),
        }
    });
    if let Some(login) = login {
        body["error"]["login"] = json!(login);
    }

    (status, Json(body)).into_response()
}

/// Pull the session id out of the Cookie header, if present
fn session_id_from(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
