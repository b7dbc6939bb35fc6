use actix_web::middleware::from_fn;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::{info, warn};
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::error::{store_error_response, unprocessable, StoreError};
use crate::models::{AssignmentCreate, AssignmentUpdate, ListParams, Message};
use crate::policy::{authorize, Capability};
use crate::AppState;

const ENTITY: &str = "Assignment";

#[get("")]
async fn list_assignments(
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

    match app_state.store.list_assignments(skip, limit).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[get("/{id}")]
async fn get_assignment(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ViewRecords).await {
        return response;
    }

    match app_state.store.get_assignment(id.into_inner()).await {
        Ok(assignment) => HttpResponse::Ok().json(assignment),
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Assign a teacher to a subject in a class form. The same triple can only be
/// assigned once; a repeat is answered with 409.
#[post("")]
async fn create_assignment(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    assignment_in: web::Json<AssignmentCreate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    match app_state.store.create_assignment(&assignment_in).await {
        Ok(assignment) => {
            info!(
                "Assigned teacher {} to subject {} in form {}",
                assignment.teacher_id, assignment.subject_id, assignment.class_form_id
            );
            HttpResponse::Ok().json(assignment)
        }
        Err(StoreError::Conflict(message)) => {
            warn!(
                "Rejected duplicate assignment of teacher {} to subject {} in form {}",
                assignment_in.teacher_id, assignment_in.subject_id, assignment_in.class_form_id
            );
            store_error_response(ENTITY, StoreError::Conflict(message))
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[put("/{id}")]
async fn update_assignment(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
    assignment_in: web::Json<AssignmentUpdate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    match app_state.store.update_assignment(id.into_inner(), &assignment_in).await {
        Ok(assignment) => HttpResponse::Ok().json(assignment),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[delete("/{id}")]
async fn delete_assignment(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    match app_state.store.delete_assignment(id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(Message::new("Assignment deleted successfully")),
        Err(e) => store_error_response(ENTITY, e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/assignments")
            .wrap(from_fn(require_bearer))
            .service(list_assignments)
            .service(create_assignment)
            .service(get_assignment)
            .service(update_assignment)
            .service(delete_assignment),
    );
}
