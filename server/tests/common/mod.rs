use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::net::SocketAddr;
use std::sync::Arc;
use story_server::config::Settings;
use story_server::generator::{GenerationError, Generator, ImageRequest};
use story_server::{build_app, AppState};

/// Generator double: answers with canned content or a canned upstream error code.
#[derive(Default)]
pub struct FakeGenerator {
    pub reply: String,
    pub fail_with: Option<&'static str>,
    pub calls: AtomicUsize,
    pub last_image: Mutex<Option<ImageRequest>>,
    pub last_system: Mutex<Option<String>>,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self { Self { reply: reply.into(), ..Default::default() } }

    pub fn failing(code: &'static str) -> Self { Self { fail_with: Some(code), ..Default::default() } }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    fn outcome(&self) -> Result<(), GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(code) => Err(GenerationError::Api { status: 400, code: Some(code.into()), message: "upstream said no".into() }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn image(&self, request: &ImageRequest) -> Result<String, GenerationError> {
        self.outcome()?;
        *self.last_image.lock() = Some(request.clone());
        Ok("https://images.example/cat.png".into())
    }

    async fn text(&self, system: &str, _prompt: &str) -> Result<String, GenerationError> {
        self.outcome()?;
        *self.last_system.lock() = Some(system.to_string());
        Ok(self.reply.clone())
    }
}

pub fn test_app(settings: Settings, generator: Arc<FakeGenerator>) -> (Router, AppState) {
    let state = AppState::new(settings, generator);
    let app = build_app(state.clone()).unwrap();
    (app, state)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, headers, json)
}

pub fn get(uri: &str) -> Request<Body> { Request::get(uri).body(Body::empty()).unwrap() }

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri).header("content-type", "application/json").body(Body::from(body.to_string())).unwrap()
}

/// Marks `request` as arriving over a connection from `peer`, as `into_make_service_with_connect_info` does.
pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    request.extensions_mut().insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}
