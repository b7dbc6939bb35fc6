use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError, UrlencodedError};
use actix_web::{HttpRequest, HttpResponse};
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("{0} does not reference an existing record")]
    InvalidReference(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One entry of a 422 body: where the bad input was and what was wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn body(field: &str, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    fn at(location: &str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec![location.to_string()],
            msg: msg.into(),
            kind: "value_error".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Detail<T: Serialize> {
    pub detail: T,
}

pub fn detail(message: &str) -> Detail<&str> {
    Detail { detail: message }
}

pub fn not_found(entity: &str) -> HttpResponse {
    HttpResponse::NotFound().json(detail(&format!("{} not found", entity)))
}

pub fn unprocessable(errors: Vec<FieldError>) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(Detail { detail: errors })
}

pub fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(detail("Internal server error"))
}

/// Maps a store failure onto the response the API promises for `entity`.
pub fn store_error_response(entity: &str, err: StoreError) -> HttpResponse {
    match err {
        StoreError::NotFound => not_found(entity),
        StoreError::Conflict(message) => HttpResponse::Conflict().json(detail(&message)),
        StoreError::InvalidReference(field) => unprocessable(vec![FieldError::body(
            field,
            format!("{} does not reference an existing record", field),
            "value_error.reference",
        )]),
        StoreError::Database(e) => {
            error!("Database error ({}): {}", entity, e);
            internal_error()
        }
        StoreError::Hash(e) => {
            error!("Password hashing error: {}", e);
            internal_error()
        }
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = unprocessable(vec![FieldError::at("body", err.to_string())]);
    InternalError::from_response(err, response).into()
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    let response = unprocessable(vec![FieldError::at("body", err.to_string())]);
    InternalError::from_response(err, response).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    let response = unprocessable(vec![FieldError::at("path", err.to_string())]);
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = unprocessable(vec![FieldError::at("query", err.to_string())]);
    InternalError::from_response(err, response).into()
}
