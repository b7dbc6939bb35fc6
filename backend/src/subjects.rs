use actix_web::middleware::from_fn;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::error::{store_error_response, unprocessable};
use crate::models::{ListParams, Message, SubjectCreate, SubjectUpdate, Validate};
use crate::policy::{authorize, Capability};
use crate::AppState;

const ENTITY: &str = "Subject";

#[get("")]
async fn list_subjects(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<ListParams>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ViewRecords).await {
        return response;
    }

    let (skip, limit) = match query.window() {
        Ok(window) => window,
        Err(errors) => return unprocessable(errors),
    };

    match app_state.store.list_subjects(skip, limit).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[get("/{id}")]
async fn get_subject(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ViewRecords).await {
        return response;
    }

    match app_state.store.get_subject(id.into_inner()).await {
        Ok(subject) => HttpResponse::Ok().json(subject),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[post("")]
async fn create_subject(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    subject_in: web::Json<SubjectCreate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    if let Err(errors) = subject_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.create_subject(&subject_in).await {
        Ok(subject) => {
            info!("Created subject {} ({})", subject.id, subject.name);
            HttpResponse::Ok().json(subject)
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[put("/{id}")]
async fn update_subject(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
    subject_in: web::Json<SubjectUpdate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    if let Err(errors) = subject_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.update_subject(id.into_inner(), &subject_in).await {
        Ok(subject) => HttpResponse::Ok().json(subject),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[delete("/{id}")]
async fn delete_subject(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    match app_state.store.delete_subject(id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(Message::new("Subject deleted successfully")),
        Err(e) => store_error_response(ENTITY, e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subjects")
            .wrap(from_fn(require_bearer))
            .service(list_subjects)
            .service(create_subject)
            .service(get_subject)
            .service(update_subject)
            .service(delete_subject),
    );
}
