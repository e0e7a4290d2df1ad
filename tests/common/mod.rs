#![allow(dead_code)]

//! In-process stand-in for the OAuth token endpoint and the Remote Config
//! REST API, enforcing `If-Match` the way the real service does.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PROJECT: &str = "demo-project";
pub const ACCESS_TOKEN: &str = "ya29.test-token";
pub const TEST_KEY_PEM: &str = include_str!("../fixtures/test_key.pem");

#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub body: Value,
    pub if_match: Option<String>,
    pub validate_only: bool,
}

#[derive(Debug)]
pub struct ServerState {
    pub document: Value,
    pub version: u64,
    pub token_requests: Vec<HashMap<String, String>>,
    pub gets: usize,
    pub puts: Vec<RecordedPut>,
    pub reject_tokens: bool,
    /// Publish a concurrent edit right after serving a read.
    pub bump_after_read: bool,
    pub omit_etag: bool,
    /// Serve reads with a body that is not a remote config document.
    pub garbage_body: bool,
    /// Answer a stale `If-Match` with 409 ABORTED instead of 412.
    pub conflict_as_aborted: bool,
    pub get_delay: Option<Duration>,
    pub put_delay: Option<Duration>,
}

impl ServerState {
    pub fn etag(&self) -> String {
        format!("etag-{}", self.version)
    }

    pub fn request_count(&self) -> usize {
        self.token_requests.len() + self.gets + self.puts.len()
    }
}

pub fn sample_document() -> Value {
    json!({
        "conditions": [
            { "name": "ios", "expression": "device.os == 'ios'", "tagColor": "BLUE" }
        ],
        "parameters": {
            "welcome_message": {
                "defaultValue": { "value": "hello" },
                "conditionalValues": { "ios": { "value": "hello iphone" } },
                "description": "Greeting on the start screen"
            },
            "max_items": { "defaultValue": { "value": "10" } }
        },
        "parameterGroups": {
            "checkout": {
                "description": "Checkout flow",
                "parameters": { "express_pay": { "defaultValue": { "value": "false" } } }
            }
        },
        "version": { "versionNumber": "7", "updateOrigin": "CONSOLE" }
    })
}

type Shared = Arc<Mutex<ServerState>>;

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(ServerState {
            document: sample_document(),
            version: 1,
            token_requests: Vec::new(),
            gets: 0,
            puts: Vec::new(),
            reject_tokens: false,
            bump_after_read: false,
            omit_etag: false,
            garbage_body: false,
            conflict_as_aborted: false,
            get_delay: None,
            put_delay: None,
        }));

        let app = Router::new()
            .route("/token", post(token))
            .route(
                "/v1/projects/:project/remoteConfig",
                get(get_config).put(put_config),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            _handle: handle,
        }
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url)
    }

    /// A service account key JSON whose token endpoint is this server.
    pub fn key_json(&self) -> Value {
        json!({
            "type": "service_account",
            "project_id": PROJECT,
            "private_key_id": "test-key-1",
            "private_key": TEST_KEY_PEM,
            "client_email": "rc-updater@demo-project.iam.gserviceaccount.com",
            "token_uri": self.token_uri(),
        })
    }

    pub fn encoded_key(&self) -> String {
        STANDARD.encode(self.key_json().to_string())
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut ServerState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }
}

fn google_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": { "code": status.as_u16(), "message": message, "status": code }
        })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ACCESS_TOKEN}"))
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let mut state = state.lock().unwrap();
    state.token_requests.push(form.clone());

    let grant_ok = form.get("grant_type").map(String::as_str)
        == Some("urn:ietf:params:oauth:grant-type:jwt-bearer");
    if state.reject_tokens || !grant_ok || !form.contains_key("assertion") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": ACCESS_TOKEN,
        "expires_in": 3599,
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn get_config(
    State(shared): State<Shared>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> Response {
    let delay = shared.lock().unwrap().get_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = shared.lock().unwrap();
    state.gets += 1;
    if !authorized(&headers) {
        return google_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Request had invalid authentication credentials.",
        );
    }
    if project != PROJECT {
        return google_error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            &format!("Project {project} not found."),
        );
    }

    let etag = state.etag();
    let document = state.document.clone();
    if state.bump_after_read {
        state.version += 1;
    }
    if state.omit_etag {
        return Json(document).into_response();
    }
    if state.garbage_body {
        return ([(header::ETAG, etag)], "<html>maintenance</html>").into_response();
    }
    ([(header::ETAG, etag)], Json(document)).into_response()
}

async fn put_config(
    State(shared): State<Shared>,
    Path(project): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = shared.lock().unwrap().put_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = shared.lock().unwrap();
    let if_match = headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let validate_only = query.get("validateOnly").map(String::as_str) == Some("true");
    state.puts.push(RecordedPut {
        body: body.clone(),
        if_match: if_match.clone(),
        validate_only,
    });

    if !authorized(&headers) {
        return google_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Request had invalid authentication credentials.",
        );
    }
    if project != PROJECT {
        return google_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Project not found.");
    }
    if if_match.as_deref() != Some(state.etag().as_str()) {
        if state.conflict_as_aborted {
            return google_error(
                StatusCode::CONFLICT,
                "ABORTED",
                "Template version changed while the request was in progress.",
            );
        }
        return google_error(
            StatusCode::PRECONDITION_FAILED,
            "FAILED_PRECONDITION",
            "ETag header provided does not match the current template version.",
        );
    }

    if !validate_only {
        state.document = body.clone();
        state.version += 1;
    }
    ([(header::ETAG, state.etag())], Json(body)).into_response()
}
