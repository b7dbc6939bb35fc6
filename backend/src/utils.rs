use actix_web::{get, web, HttpResponse, Responder};

#[get("/health-check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(true)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/utils").service(health_check));
}
