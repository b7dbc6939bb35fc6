use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{detail, store_error_response, StoreError};
use crate::models::User;
use crate::security::{self, Claims};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header(("WWW-Authenticate", "Bearer"))
        .json(detail(message))
}

/// Extract and validate the bearer token of a request
pub fn verify_token(req: &HttpRequest, app_state: &AppState) -> Result<Claims, HttpResponse> {
    let header_str = match req.headers().get("Authorization") {
        Some(header) => header.to_str().unwrap_or(""),
        None => return Err(unauthorized("Not authenticated")),
    };

    let token = match header_str.strip_prefix("Bearer ") {
        Some(token) => token,
        None => return Err(unauthorized("Not authenticated")),
    };

    security::decode_access_token(token, &app_state.settings.jwt_secret)
        .map_err(|_| unauthorized("Could not validate credentials"))
}

/// Scope middleware that answers 401 before any handler extractor reads the body.
pub async fn require_bearer(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if let Some(app_state) = req.app_data::<web::Data<AppState>>().cloned() {
        if let Err(response) = verify_token(req.request(), &app_state) {
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

/// Resolves the caller behind the bearer token; inactive accounts are refused.
pub async fn current_user(req: &HttpRequest, app_state: &AppState) -> Result<User, HttpResponse> {
    let claims = verify_token(req, app_state)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| unauthorized("Could not validate credentials"))?;

    let user = match app_state.store.get_user(user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(unauthorized("User not found")),
        Err(e) => return Err(store_error_response("User", e)),
    };

    if !user.is_active {
        return Err(HttpResponse::BadRequest().json(detail("Inactive user")));
    }

    Ok(user)
}

/// Checks email and password; `None` covers both unknown email and wrong password.
pub async fn authenticate(
    app_state: &AppState,
    email: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    let user = match app_state.store.find_user_by_email(email).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    if !security::verify_password(password, &user.hashed_password) {
        return Ok(None);
    }

    Ok(Some(user))
}

#[post("/access-token")]
async fn login_access_token(
    app_state: web::Data<AppState>,
    credentials: web::Form<LoginRequest>,
) -> impl Responder {
    let user = match authenticate(&app_state, &credentials.username, &credentials.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::BadRequest().json(detail("Incorrect email or password"));
        }
        Err(e) => return store_error_response("User", e),
    };

    if !user.is_active {
        return HttpResponse::BadRequest().json(detail("Inactive user"));
    }

    let access_token = match security::create_access_token(
        user.id,
        &app_state.settings.jwt_secret,
        app_state.settings.access_token_expire_minutes,
    ) {
        Ok(token) => token,
        Err(e) => {
            error!("JWT encoding error: {}", e);
            return HttpResponse::InternalServerError().json(detail("Could not generate token"));
        }
    };

    info!("Issued access token for user {}", user.id);

    HttpResponse::Ok().json(Token {
        access_token,
        token_type: "bearer".to_string(),
    })
}

#[post("/test-token")]
async fn test_token(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    match current_user(&req, &app_state).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(response) => response,
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/login")
            .service(login_access_token)
            .service(test_token),
    );
}
