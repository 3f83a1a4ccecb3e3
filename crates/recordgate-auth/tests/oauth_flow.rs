//! Authorization-code round trip against a mock token endpoint

mod common;

use std::sync::Arc;
use std::time::Duration;

use recordgate_auth::{
    AuthErrorKind, AuthRequest, Authenticator, MemorySessionStore, OAuthConfig, OAuthFlow,
    SessionAuthenticator, SessionStore,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(token_url: &str) -> OAuthConfig {
    OAuthConfig {
        client_id: "recordgate-client".to_string(),
        client_secret: SecretString::new("client-secret".to_string()),
        auth_url: "https://provider.example.com/authorize".to_string(),
        token_url: token_url.to_string(),
        redirect_url: "http://localhost:8080/auth/callback".to_string(),
    }
}

fn store() -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::new(Duration::from_secs(3600)))
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-access-token",
            "token_type": "bearer",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_parks_high_entropy_state_and_a_pkce_challenge() {
    let store = store();
    let flow = OAuthFlow::new(config("https://provider.example.com/token"), Arc::clone(&store))
        .unwrap();

    let session_id = store.create().await;
    let url = flow.login(&session_id).await.unwrap();

    let session = store.load(&session_id).await.unwrap();
    let state = session.state.unwrap();
    // 32 random bytes base64url-encode to 43 characters.
    assert!(state.len() >= 43);
    assert!(session.pkce_verifier.is_some());

    let params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert!(params.iter().any(|(k, v)| k == "state" && *v == state));
    assert!(params.iter().any(|(k, _)| k == "code_challenge"));
    assert!(params
        .iter()
        .any(|(k, v)| k == "code_challenge_method" && v == "S256"));
}

#[tokio::test]
async fn callback_with_matching_state_stores_the_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let store = store();
    let flow =
        OAuthFlow::new(config(&format!("{}/token", server.uri())), Arc::clone(&store)).unwrap();

    let session_id = store.create().await;
    flow.login(&session_id).await.unwrap();
    let state = store.load(&session_id).await.unwrap().state.unwrap();

    flow.callback(&session_id, "auth-code", &state).await.unwrap();

    let session = store.load(&session_id).await.unwrap();
    let token = session.token.unwrap();
    assert_eq!(token.access_token, "provider-access-token");
    assert!(token.expires_at.is_some());
    // The one-time state is gone.
    assert!(session.state.is_none());

    // The session now authenticates data requests.
    let auth = SessionAuthenticator::new(store, "/auth/login");
    let ctx = auth
        .authenticate(&AuthRequest::session(session_id.clone()))
        .await
        .unwrap();
    assert_eq!(ctx.subject, session_id);
}

#[tokio::test]
async fn exchange_sends_the_pkce_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code_verifier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-access-token",
            "token_type": "bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store();
    let flow =
        OAuthFlow::new(config(&format!("{}/token", server.uri())), Arc::clone(&store)).unwrap();

    let session_id = store.create().await;
    flow.login(&session_id).await.unwrap();
    let state = store.load(&session_id).await.unwrap().state.unwrap();
    flow.callback(&session_id, "auth-code", &state).await.unwrap();
}

#[tokio::test]
async fn mismatched_state_rejects_and_leaves_the_login_pending() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let store = store();
    let flow =
        OAuthFlow::new(config(&format!("{}/token", server.uri())), Arc::clone(&store)).unwrap();

    let session_id = store.create().await;
    flow.login(&session_id).await.unwrap();
    let state = store.load(&session_id).await.unwrap().state.unwrap();

    let err = flow
        .callback(&session_id, "auth-code", "forged-state")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::AuthInvalid);
    assert_eq!(err.to_string(), "state mismatch");

    // The parked state was not consumed; the real round trip still lands.
    flow.callback(&session_id, "auth-code", &state).await.unwrap();
}

#[tokio::test]
async fn state_is_single_use() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let store = store();
    let flow =
        OAuthFlow::new(config(&format!("{}/token", server.uri())), Arc::clone(&store)).unwrap();

    let session_id = store.create().await;
    flow.login(&session_id).await.unwrap();
    let state = store.load(&session_id).await.unwrap().state.unwrap();

    flow.callback(&session_id, "auth-code", &state).await.unwrap();

    let err = flow
        .callback(&session_id, "auth-code", &state)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::AuthInvalid);
    assert_eq!(err.to_string(), "no login in progress");
}

#[tokio::test]
async fn failed_exchange_stores_no_token_and_consumes_the_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = store();
    let flow =
        OAuthFlow::new(config(&format!("{}/token", server.uri())), Arc::clone(&store)).unwrap();

    let session_id = store.create().await;
    flow.login(&session_id).await.unwrap();
    let state = store.load(&session_id).await.unwrap().state.unwrap();

    let err = flow
        .callback(&session_id, "auth-code", &state)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::AuthInvalid);
    assert_eq!(err.to_string(), "token exchange failed");

    let session = store.load(&session_id).await.unwrap();
    assert!(session.token.is_none());
    // A replay of the same callback cannot retry the exchange.
    assert!(session.state.is_none());
}

#[tokio::test]
async fn callback_without_a_login_is_rejected() {
    let store = store();
    let flow = OAuthFlow::new(config("https://provider.example.com/token"), Arc::clone(&store))
        .unwrap();

    let session_id = store.create().await;
    let err = flow
        .callback(&session_id, "auth-code", "some-state")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::AuthInvalid);
    assert_eq!(err.to_string(), "no login in progress");
}
