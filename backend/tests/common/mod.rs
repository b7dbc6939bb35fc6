//! Shared fixtures for the HTTP-level tests.
//!
//! Every test gets a fresh `MemoryStore`; users are seeded straight into the
//! store and authenticate with tokens minted for them.

#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web};
use serde_json::Value;
use std::sync::Arc;

use schoolbook_backend::config::Settings;
use schoolbook_backend::models::{NewUser, User};
use schoolbook_backend::security;
use schoolbook_backend::store::{MemoryStore, SchoolStore};
use schoolbook_backend::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct-horse";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = web::Data::new(AppState {
            store: store.clone(),
            settings: Settings::for_secret(SECRET),
        });
        Self { store, state }
    }

    async fn seed(&self, email: &str, is_superuser: bool, is_class_teacher: bool, is_active: bool) -> User {
        let hashed_password = security::hash_password(PASSWORD).unwrap();
        self.store
            .create_user(NewUser {
                email: email.to_string(),
                hashed_password,
                full_name: None,
                is_active,
                is_superuser,
                is_class_teacher,
                is_accountant: false,
            })
            .await
            .unwrap()
    }

    pub async fn superuser(&self) -> (User, String) {
        let user = self.seed("admin@school.com", true, false, true).await;
        let token = token_for(&user);
        (user, token)
    }

    pub async fn class_teacher(&self) -> (User, String) {
        let user = self.seed("teacher@school.com", false, true, true).await;
        let token = token_for(&user);
        (user, token)
    }

    pub async fn staff(&self) -> (User, String) {
        let user = self.seed("staff@school.com", false, false, true).await;
        let token = token_for(&user);
        (user, token)
    }

    pub async fn inactive(&self) -> (User, String) {
        let user = self.seed("former@school.com", false, false, false).await;
        let token = token_for(&user);
        (user, token)
    }
}

pub fn token_for(user: &User) -> String {
    security::create_access_token(user.id, SECRET, 60).unwrap()
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Sends `req` and returns the status with the body parsed as JSON
/// (`Value::Null` for an empty body).
pub async fn call<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
