//! Common test utilities for integration tests
//!
//! Every test gets its own in-memory store and audit sink, so tests run
//! without Postgres and never share state.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tasktrack_api::app::{build_router, AppState};
use tasktrack_api::config::{
    ApiConfig, Config, DatabaseConfig, JwtConfig, ListingConfig, LogFormat, MEMORY_DATABASE_URL,
};
use tasktrack_shared::audit::MemoryAuditSink;
use tasktrack_shared::auth::password::hash_password;
use tasktrack_shared::models::user::{CreateUser, User};
use tasktrack_shared::store::memory::MemoryStore;
use tasktrack_shared::store::UserStore;
use tower::ServiceExt;

pub const PASSWORD: &str = "Tr1cky-Lantern-42";

pub const HOST: &str = "testserver";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub app: Router,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: MEMORY_DATABASE_URL.to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret-at-least-32-bytes".to_string(),
            access_lifetime_minutes: 60,
            refresh_lifetime_hours: 24,
        },
        listing: ListingConfig {
            page_size: 10,
            time_zone: chrono_tz::UTC,
        },
        log_format: LogFormat::Pretty,
    }
}

/// Response status plus the body parsed as JSON (`Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAuditSink::default());
        let state = AppState::new(store.clone(), config.clone(), audit.clone());
        let app = build_router(state);

        Self {
            store,
            audit,
            app,
            config,
        }
    }

    /// Sends a request, with a JSON body and bearer token when given
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, HOST);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a regular user through the API
    pub async fn register(&self, username: &str) -> Value {
        let response = self
            .post(
                "/api/users/register/",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Creates a staff account directly in the store
    pub async fn create_staff(&self, username: &str) -> User {
        self.store
            .create_user(CreateUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: hash_password(PASSWORD).unwrap(),
                first_name: String::new(),
                last_name: String::new(),
                is_staff: true,
                is_superuser: false,
            })
            .await
            .unwrap()
    }

    /// Obtains a token pair and returns the access token
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post(
                "/api/token/",
                None,
                serde_json::json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["access"].as_str().unwrap().to_string()
    }

    /// Registers a user and logs them in; returns `(user id, access token)`
    pub async fn user_with_token(&self, username: &str) -> (String, String) {
        let user = self.register(username).await;
        let token = self.login(username).await;
        (user["id"].as_str().unwrap().to_string(), token)
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, token: &str, description: &str) -> String {
        let response = self
            .post(
                "/api/tasks/create/",
                Some(token),
                serde_json::json!({ "description": description }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}
