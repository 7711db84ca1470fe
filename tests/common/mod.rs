#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, Uri},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Healthy,
    ServerError,
    Malformed,
}

#[derive(Debug, Default)]
struct ServiceState {
    counters: HashMap<String, u64>,
    interactions: BTreeMap<String, u64>,
    log: Vec<String>,
    mode: Mode,
}

/// Fake counting service speaking the same JSON contract as the real one.
#[derive(Debug, Clone, Default)]
pub struct FakeService {
    state: Arc<Mutex<ServiceState>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        *self.state.lock().unwrap() = ServiceState::default();
    }

    pub fn set_count(&self, path: &str, count: u64) {
        self.state
            .lock()
            .unwrap()
            .counters
            .insert(path.to_string(), count);
    }

    pub fn set_interaction(&self, key: &str, count: u64) {
        self.state
            .lock()
            .unwrap()
            .interactions
            .insert(key.to_string(), count);
    }

    pub fn interaction(&self, key: &str) -> u64 {
        self.state
            .lock()
            .unwrap()
            .interactions
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn set_mode(&self, mode: Mode) {
        self.state.lock().unwrap().mode = mode;
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.log().iter().filter(|entry| entry.as_str() == call).count()
    }
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    #[serde(rename = "postId")]
    post_id: String,
    #[serde(rename = "type")]
    kind: String,
    action: String,
}

pub fn router(service: FakeService) -> Router {
    Router::new()
        .route("/", get(counter).post(counter))
        .route("/blog", get(counter).post(counter))
        .route("/downloads", get(counter).post(counter))
        .route("/interactions", get(list_interactions).post(toggle_interaction))
        .with_state(service)
}

async fn counter(
    State(service): State<FakeService>,
    method: Method,
    uri: Uri,
) -> Result<Json<Value>, StatusCode> {
    let mut state = service.state.lock().unwrap();
    state.log.push(format!("{method} {}", uri.path()));
    match state.mode {
        Mode::ServerError => return Err(StatusCode::INTERNAL_SERVER_ERROR),
        Mode::Malformed => return Ok(Json(json!({ "total": 3 }))),
        Mode::Healthy => {}
    }

    let count = state.counters.entry(uri.path().to_string()).or_default();
    if method == Method::POST {
        *count += 1;
    }
    Ok(Json(json!({ "count": *count })))
}

async fn list_interactions(
    State(service): State<FakeService>,
) -> Result<Json<BTreeMap<String, u64>>, StatusCode> {
    let mut state = service.state.lock().unwrap();
    state.log.push("GET /interactions".to_string());
    if state.mode == Mode::ServerError {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(state.interactions.clone()))
}

async fn toggle_interaction(
    State(service): State<FakeService>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<Value>, StatusCode> {
    let mut state = service.state.lock().unwrap();
    state.log.push(format!(
        "POST /interactions {}_{} {}",
        body.post_id, body.kind, body.action
    ));
    if state.mode == Mode::ServerError {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let key = format!("{}_{}", body.post_id, body.kind);
    let count = state.interactions.entry(key).or_default();
    *count = if body.action == "remove" {
        count.saturating_sub(1)
    } else {
        *count + 1
    };
    Ok(Json(
        json!({ "postId": body.post_id, "type": body.kind, "count": *count }),
    ))
}

/// Serves `service` from the current runtime and returns its base URL.
pub async fn spawn(service: FakeService) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake service");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(service)).await.unwrap();
    });
    format!("http://{addr}")
}

/// Serves `service` from a dedicated thread that outlives any test runtime.
pub fn spawn_detached(service: FakeService) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake service");
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("fake service runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router(service)).await.unwrap();
        });
    });
    format!("http://{addr}")
}

/// An address nothing listens on.
pub fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub fn unique_dir(label: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "site_counters_{label}_{}_{}",
        std::process::id(),
        nanos
    ));
    path
}
