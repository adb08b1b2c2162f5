use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::app_state::AppState;

#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    match state.database.health_check().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "ok" })),
        Err(err) => {
            log::error!("health check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded" }))
        }
    }
}
