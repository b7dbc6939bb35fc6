pub mod assignments;
pub mod auth;
pub mod class_forms;
pub mod config;
pub mod error;
pub mod grades;
pub mod models;
pub mod policy;
pub mod security;
pub mod store;
pub mod students;
pub mod subjects;
pub mod users;
pub mod utils;

use actix_cors::Cors;
use actix_web::{middleware, web, App};
use sqlx::postgres::PgPool;
use std::sync::Arc;

use crate::config::Settings;
use crate::store::SchoolStore;

pub struct AppState {
    pub store: Arc<dyn SchoolStore>,
    pub settings: Settings,
}

fn cors(settings: &Settings) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if settings.cors_origins.is_empty() {
        return cors.allow_any_origin();
    }

    settings
        .cors_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

pub fn create_app(app_state: web::Data<AppState>) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let cors = cors(&app_state.settings);

    App::new()
        .app_data(app_state)
        .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::FormConfig::default().error_handler(error::form_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .wrap(cors)
        .wrap(middleware::NormalizePath::trim())
        .wrap(middleware::Logger::default())
        .service(
            web::scope("/api/v1")
                .configure(auth::configure)
                .configure(users::configure)
                .configure(utils::configure)
                .configure(students::configure)
                .configure(grades::configure)
                .configure(subjects::configure)
                .configure(class_forms::configure)
                .configure(assignments::configure),
        )
}

pub async fn init_db(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}
