use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use http::StatusCode;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use leptos_entra_auth::EntraAuthOptions;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::{net::TcpListener, task::JoinHandle};
use url::Url;

pub const TENANT: &str = "test-tenant";
pub const CLIENT_ID: &str = "test-client";
pub const REDIRECT_URI: &str = "http://127.0.0.1:5173/";

const KID: &str = "stub-key";
const SECRET: &[u8] = b"entra-test-signing-secre";
const SECRET_B64: &str = "ZW50cmEtdGVzdC1zaWduaW5nLXNlY3Jl";

/// How the token endpoint answers.
#[derive(Debug, Clone, Copy)]
pub enum TokenEndpointBehavior {
    /// 200 with access and identity token for "Ada".
    Issue,

    /// 400 with an OAuth error body.
    RejectInvalidGrant,

    /// 502 with a body that is not JSON.
    FailUnparsable,

    /// Answers only after the given delay.
    Stall(Duration),
}

struct StubState {
    behavior: TokenEndpointBehavior,
    issuer: String,
    hits: AtomicUsize,
    forms: Mutex<Vec<HashMap<String, String>>>,
}

pub struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Token and key endpoints of a single tenant, served on an ephemeral port.
pub struct StubIdentityProvider {
    pub authority: Url,
    state: Arc<StubState>,
    _server: AbortOnDrop<()>,
}

impl StubIdentityProvider {
    pub async fn start(behavior: TokenEndpointBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("TcpListener");
        let addr = listener.local_addr().expect("local addr");

        let state = Arc::new(StubState {
            behavior,
            issuer: format!("http://{addr}/{TENANT}/v2.0"),
            hits: AtomicUsize::new(0),
            forms: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route(&format!("/{TENANT}/oauth2/v2.0/token"), post(token))
            .route(&format!("/{TENANT}/discovery/v2.0/keys"), get(keys))
            .with_state(Arc::clone(&state));

        let server_jh = tokio::spawn(async move {
            tracing::info!("Serving stub identity provider...");
            axum::serve(listener, router)
                .await
                .expect("Server to start successfully");
        });

        Self {
            authority: Url::parse(&format!("http://{addr}/")).expect("valid url"),
            state,
            _server: AbortOnDrop(server_jh),
        }
    }

    pub fn options(&self) -> EntraAuthOptions {
        let mut options =
            EntraAuthOptions::new(CLIENT_ID, Url::parse(REDIRECT_URI).expect("valid url"));
        options.authority = self.authority.clone();
        options.tenant_id = TENANT.to_owned();
        options
    }

    /// Number of requests the token endpoint received.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Form bodies the token endpoint received, in order.
    pub fn forms(&self) -> Vec<HashMap<String, String>> {
        self.state.forms.lock().expect("not poisoned").clone()
    }
}

async fn token(
    State(state): State<Arc<StubState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.forms.lock().expect("not poisoned").push(form);

    match state.behavior {
        TokenEndpointBehavior::Issue => issue(&state.issuer),
        TokenEndpointBehavior::RejectInvalidGrant => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "invalid_grant",
            })),
        )
            .into_response(),
        TokenEndpointBehavior::FailUnparsable => {
            (StatusCode::BAD_GATEWAY, "<html>upstream down</html>").into_response()
        }
        TokenEndpointBehavior::Stall(delay) => {
            tokio::time::sleep(delay).await;
            issue(&state.issuer)
        }
    }
}

fn issue(issuer: &str) -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token_type": "Bearer",
            "scope": "openid profile email User.Read",
            "expires_in": 3600,
            "ext_expires_in": 3600,
            "access_token": "stub-access-token",
            "id_token": id_token(issuer),
        })),
    )
        .into_response()
}

async fn keys() -> Response {
    Json(serde_json::json!({
        "keys": [
            { "kty": "oct", "kid": KID, "alg": "HS256", "k": SECRET_B64 },
            { "kty": "unknown-key-type", "kid": "ignored" },
        ]
    }))
    .into_response()
}

pub fn id_token(issuer: &str) -> String {
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_owned());
    jsonwebtoken::encode(
        &header,
        &serde_json::json!({
            "iss": issuer,
            "aud": CLIENT_ID,
            "iat": now,
            "nbf": now,
            "exp": now + 3600,
            "name": "Ada",
            "email": "ada@x.com",
            "preferred_username": "ada@contoso.onmicrosoft.com",
            "oid": "123",
            "sub": "pairwise-subject",
            "tid": TENANT,
        }),
        &EncodingKey::from_secret(SECRET),
    )
    .expect("encodable claims")
}
