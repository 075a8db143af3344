//! Router harness over a seeded in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use appdeck_api::{create_api_router, ApiConfig, AppState, AuthConfig, JwtSecret, TokenService};
use appdeck_core::{Application, Identity};
use appdeck_storage::{CacheBackend, CacheCoordinator, CoordinatorConfig, InMemoryCacheBackend};
use appdeck_test_utils::fixtures::seeded_store;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const SECRET: &str = "integration-test-signing-secret-0123456789";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub active_app: Application,
    pub inactive_app: Application,
}

/// Seeded app with an in-memory cache.
pub async fn spawn_app() -> TestResult<TestApp> {
    spawn_app_with_cache(Arc::new(InMemoryCacheBackend::new())).await
}

pub async fn spawn_app_with_cache(backend: Arc<dyn CacheBackend>) -> TestResult<TestApp> {
    let seeded = seeded_store().await?;
    let store = Arc::new(seeded.store);
    let tokens = TokenService::new(AuthConfig::new(JwtSecret::new(SECRET)?));
    let cache = CacheCoordinator::new(backend, CoordinatorConfig::default());

    let state = AppState::new(store.clone(), store, cache, tokens);
    let router = create_api_router(state.clone(), &ApiConfig::default());

    Ok(TestApp {
        router,
        state,
        active_app: seeded.active_app,
        inactive_app: seeded.inactive_app,
    })
}

impl TestApp {
    pub fn bearer_for(&self, identity: &Identity) -> TestResult<String> {
        let issued = self.state.tokens.issue(identity)?;
        Ok(format!("Bearer {}", issued.token))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResult<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok((status, body))
    }

    /// Request with an optional `Authorization` value and JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    /// External API request carrying `key` in `X-API-Key`.
    pub async fn call_external(&self, uri: &str, key: Option<&str>) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(key) = key {
            builder = builder.header(appdeck_api::API_KEY_HEADER, key);
        }
        self.send(builder.body(Body::empty())?).await
    }
}
