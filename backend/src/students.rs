use actix_web::middleware::from_fn;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::error::{store_error_response, unprocessable};
use crate::models::{ListParams, Message, StudentCreate, StudentUpdate, Validate};
use crate::policy::{authorize, Capability};
use crate::AppState;

const ENTITY: &str = "Student";

#[get("")]
async fn list_students(
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

    match app_state.store.list_students(skip, limit).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[get("/{id}")]
async fn get_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ViewRecords).await {
        return response;
    }

    match app_state.store.get_student(id.into_inner()).await {
        Ok(student) => HttpResponse::Ok().json(student),
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Enroll a student; the caller becomes the owner.
#[post("")]
async fn create_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    student_in: web::Json<StudentCreate>,
) -> impl Responder {
    let current_user = match authorize(&req, &app_state, Capability::ManageStudents).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if let Err(errors) = student_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.create_student(&student_in, current_user.id).await {
        Ok(student) => {
            info!(
                "User {} enrolled student {} in form {}",
                current_user.id, student.id, student.form_id
            );
            HttpResponse::Ok().json(student)
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[put("/{id}")]
async fn update_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
    student_in: web::Json<StudentUpdate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageStudents).await {
        return response;
    }

    if let Err(errors) = student_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.update_student(id.into_inner(), &student_in).await {
        Ok(student) => HttpResponse::Ok().json(student),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[delete("/{id}")]
async fn delete_student(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageStudents).await {
        return response;
    }

    let student_id = id.into_inner();
    match app_state.store.delete_student(student_id).await {
        Ok(()) => {
            info!("Deleted student {} and their grades", student_id);
            HttpResponse::Ok().json(Message::new("Student deleted successfully"))
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/students")
            .wrap(from_fn(require_bearer))
            .service(list_students)
            .service(create_student)
            .service(get_student)
            .service(update_student)
            .service(delete_student),
    );
}
