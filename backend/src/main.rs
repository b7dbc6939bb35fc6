use actix_web::{web, HttpServer};
use log::{info, warn};
use schoolbook_backend::config::Settings;
use schoolbook_backend::store::PgStore;
use schoolbook_backend::users::ensure_first_superuser;
use schoolbook_backend::{create_app, init_db, AppState};
use std::path::PathBuf;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // A .env file in the project root is optional; real environment variables win
    if let Some(root) = PathBuf::from(env!("CARGO_MANIFEST_DIR")).parent() {
        let env_path = root.join(".env");
        if let Err(e) = dotenv::from_path(&env_path) {
            warn!("No .env file loaded from {:?}: {}", env_path, e);
        }
    }

    let settings = Settings::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let db_pool = init_db(&settings.database_url)
        .await
        .map_err(|e| std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to initialize database: {}", e)
        ))?;

    info!("Database initialized successfully");

    let store = Arc::new(PgStore::new(db_pool));

    ensure_first_superuser(store.as_ref(), &settings)
        .await
        .map_err(|e| std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to create first superuser: {}", e)
        ))?;

    let bind = (settings.bind_address.clone(), settings.port);
    let app_state = web::Data::new(AppState { store, settings });

    info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || create_app(app_state.clone()))
        .bind(bind)?
        .run()
        .await
}
