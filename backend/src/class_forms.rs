use actix_web::middleware::from_fn;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::error::{store_error_response, unprocessable};
use crate::models::{ClassFormCreate, ClassFormUpdate, ListParams, Message, Validate};
use crate::policy::{authorize, Capability};
use crate::AppState;

const ENTITY: &str = "Class Form";

#[get("")]
async fn list_class_forms(
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

    match app_state.store.list_class_forms(skip, limit).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[get("/{id}")]
async fn get_class_form(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ViewRecords).await {
        return response;
    }

    match app_state.store.get_class_form(id.into_inner()).await {
        Ok(class_form) => HttpResponse::Ok().json(class_form),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[post("")]
async fn create_class_form(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    class_form_in: web::Json<ClassFormCreate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    if let Err(errors) = class_form_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.create_class_form(&class_form_in).await {
        Ok(class_form) => {
            info!("Created class form {} ({})", class_form.id, class_form.name);
            HttpResponse::Ok().json(class_form)
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[put("/{id}")]
async fn update_class_form(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
    class_form_in: web::Json<ClassFormUpdate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    if let Err(errors) = class_form_in.validate() {
        return unprocessable(errors);
    }

    match app_state.store.update_class_form(id.into_inner(), &class_form_in).await {
        Ok(class_form) => HttpResponse::Ok().json(class_form),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[delete("/{id}")]
async fn delete_class_form(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageCurriculum).await {
        return response;
    }

    match app_state.store.delete_class_form(id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().json(Message::new("Class Form deleted successfully")),
        Err(e) => store_error_response(ENTITY, e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/class-forms")
            .wrap(from_fn(require_bearer))
            .service(list_class_forms)
            .service(create_class_form)
            .service(get_class_form)
            .service(update_class_form)
            .service(delete_class_form),
    );
}
