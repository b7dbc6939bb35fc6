use actix_web::middleware::from_fn;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::error::{store_error_response, unprocessable};
use crate::models::{GradeCreate, GradeUpdate, ListParams, Message, Validate};
use crate::policy::{authorize, Capability};
use crate::AppState;

const ENTITY: &str = "Grade";

#[get("")]
async fn list_grades(
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

    match app_state.store.list_grades(skip, limit).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[get("/{id}")]
async fn get_grade(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ViewRecords).await {
        return response;
    }

    match app_state.store.get_grade(id.into_inner()).await {
        Ok(grade) => HttpResponse::Ok().json(grade),
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Recording a grade twice for the same student and subject overwrites
/// the first one instead of failing.
#[post("")]
async fn create_grade(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    grade_in: web::Json<GradeCreate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::RecordGrades).await {
        return response;
    }

    if let Err(errors) = grade_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.upsert_grade(&grade_in).await {
        Ok(grade) => {
            info!(
                "Recorded grade {} for student {} in subject {}",
                grade.id, grade.student_id, grade.subject_id
            );
            HttpResponse::Ok().json(grade)
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[put("/{id}")]
async fn update_grade(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
    grade_in: web::Json<GradeUpdate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::RecordGrades).await {
        return response;
    }

    if let Err(errors) = grade_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.update_grade(id.into_inner(), &grade_in).await {
        Ok(grade) => HttpResponse::Ok().json(grade),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[delete("/{id}")]
async fn delete_grade(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::RecordGrades).await {
        return response;
    }

    match app_state.store.delete_grade(id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(Message::new("Grade deleted successfully")),
        Err(e) => store_error_response(ENTITY, e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/grades")
            .wrap(from_fn(require_bearer))
            .service(list_grades)
            .service(create_grade)
            .service(get_grade)
            .service(update_grade)
            .service(delete_grade),
    );
}
