use actix_web::middleware::from_fn;
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use uuid::Uuid;

use crate::auth::{current_user, require_bearer};
use crate::config::Settings;
use crate::error::{detail, internal_error, store_error_response, unprocessable, StoreError};
use crate::models::{
    ListParams, Message, NewUser, UpdatePassword, User, UserChanges, UserCreate, UserUpdate,
    UserUpdateMe, Validate,
};
use crate::policy::{authorize, require, Capability};
use crate::security;
use crate::store::SchoolStore;
use crate::AppState;

const ENTITY: &str = "User";

fn hash_or_500(password: &str) -> Result<String, HttpResponse> {
    security::hash_password(password).map_err(|e| {
        error!("Password hashing error: {}", e);
        internal_error()
    })
}

#[get("")]
async fn list_users(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    query: web::Query<ListParams>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageUsers).await {
        return response;
    }

    let (skip, limit) = match query.window() {
        Ok(window) => window,
        Err(errors) => return unprocessable(errors),
    };

    match app_state.store.list_users(skip, limit).await {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[post("")]
async fn create_user(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    user_in: web::Json<UserCreate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageUsers).await {
        return response;
    }

    if let Err(errors) = user_in.validate() {
        return unprocessable(errors);
    }

    let hashed_password = match hash_or_500(&user_in.password) {
        Ok(hash) => hash,
        Err(response) => return response,
    };

    let user_in = user_in.into_inner();
    let new_user = NewUser {
        email: user_in.email,
        hashed_password,
        full_name: user_in.full_name,
        is_active: user_in.is_active,
        is_superuser: user_in.is_superuser,
        is_class_teacher: user_in.is_class_teacher,
        is_accountant: user_in.is_accountant,
    };

    match app_state.store.create_user(new_user).await {
        Ok(user) => {
            info!("Created user {} ({})", user.id, user.email);
            HttpResponse::Ok().json(user)
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Get the caller's own account
#[get("/me")]
async fn read_user_me(req: HttpRequest, app_state: web::Data<AppState>) -> impl Responder {
    match current_user(&req, &app_state).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(response) => response,
    }
}

/// Update the caller's own name or email
#[patch("/me")]
async fn update_user_me(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    user_in: web::Json<UserUpdateMe>,
) -> impl Responder {
    let user = match current_user(&req, &app_state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if let Err(errors) = user_in.validate() {
        return unprocessable(errors);
    }

    let user_in = user_in.into_inner();
    let changes = UserChanges {
        email: user_in.email,
        full_name: user_in.full_name,
        ..Default::default()
    };

    match app_state.store.update_user(user.id, changes).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Change the caller's password
#[patch("/me/password")]
async fn update_password_me(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    body: web::Json<UpdatePassword>,
) -> impl Responder {
    let user = match current_user(&req, &app_state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    if let Err(errors) = body.validate() {
        return unprocessable(errors);
    }

    if !security::verify_password(&body.current_password, &user.hashed_password) {
        return HttpResponse::BadRequest().json(detail("Incorrect password"));
    }

    if body.current_password == body.new_password {
        return HttpResponse::BadRequest()
            .json(detail("New password cannot be the same as the current one"));
    }

    let hashed_password = match hash_or_500(&body.new_password) {
        Ok(hash) => hash,
        Err(response) => return response,
    };

    let changes = UserChanges {
        hashed_password: Some(hashed_password),
        ..Default::default()
    };

    match app_state.store.update_user(user.id, changes).await {
        Ok(_) => HttpResponse::Ok().json(Message::new("Password updated successfully")),
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Users may read their own record; anyone else needs user management rights
#[get("/{id}")]
async fn read_user_by_id(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    let caller = match current_user(&req, &app_state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let user_id = id.into_inner();
    if caller.id == user_id {
        return HttpResponse::Ok().json(caller);
    }

    if let Err(response) = require(&caller, Capability::ManageUsers) {
        return response;
    }

    match app_state.store.get_user(user_id).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(ENTITY, e),
    }
}

#[patch("/{id}")]
async fn update_user(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
    user_in: web::Json<UserUpdate>,
) -> impl Responder {
    if let Err(response) = authorize(&req, &app_state, Capability::ManageUsers).await {
        return response;
    }

    if let Err(errors) = user_in.validate() {
        return unprocessable(errors);
    }

    let hashed_password = match &user_in.password {
        Some(password) => match hash_or_500(password) {
            Ok(hash) => Some(hash),
            Err(response) => return response,
        },
        None => None,
    };

    let user_in = user_in.into_inner();
    let changes = UserChanges {
        email: user_in.email,
        hashed_password,
        full_name: user_in.full_name,
        is_active: user_in.is_active,
        is_superuser: user_in.is_superuser,
        is_class_teacher: user_in.is_class_teacher,
        is_accountant: user_in.is_accountant,
    };

    match app_state.store.update_user(id.into_inner(), changes).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Deleting a user also removes the students they own and their assignments
#[delete("/{id}")]
async fn delete_user(
    req: HttpRequest,
    app_state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> impl Responder {
    let caller = match authorize(&req, &app_state, Capability::ManageUsers).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let user_id = id.into_inner();
    if caller.id == user_id {
        return HttpResponse::Forbidden()
            .json(detail("Super users are not allowed to delete themselves"));
    }

    match app_state.store.delete_user(user_id).await {
        Ok(()) => {
            info!("User {} deleted user {}", caller.id, user_id);
            HttpResponse::Ok().json(Message::new("User deleted successfully"))
        }
        Err(e) => store_error_response(ENTITY, e),
    }
}

/// Creates the configured first superuser unless an account with that email exists.
pub async fn ensure_first_superuser(
    store: &dyn SchoolStore,
    settings: &Settings,
) -> Result<Option<User>, StoreError> {
    let first = match &settings.first_superuser {
        Some(first) => first,
        None => return Ok(None),
    };

    if store.find_user_by_email(&first.email).await?.is_some() {
        return Ok(None);
    }

    let hashed_password =
        security::hash_password(&first.password).map_err(|e| StoreError::Hash(e.to_string()))?;

    let user = store
        .create_user(NewUser {
            email: first.email.clone(),
            hashed_password,
            full_name: None,
            is_active: true,
            is_superuser: true,
            is_class_teacher: false,
            is_accountant: false,
        })
        .await?;

    info!("Created first superuser {}", user.email);
    Ok(Some(user))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // "/me" routes must be registered ahead of "/{id}"
    cfg.service(
        web::scope("/users")
            .wrap(from_fn(require_bearer))
            .service(list_users)
            .service(create_user)
            .service(read_user_me)
            .service(update_user_me)
            .service(update_password_me)
            .service(read_user_by_id)
            .service(update_user)
            .service(delete_user),
    );
}
