use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    identity::{require_owner, require_teacher, Identity},
};

#[get("/api/tests/{id}/analytics")]
async fn test_analytics(
    state: web::Data<AppState>,
    id: web::Path<String>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    require_teacher(&identity)?;

    let analytics = state.analytics_service.compute_analytics(&id).await?;
    require_owner(&identity, &analytics.created_by)?;

    Ok(HttpResponse::Ok().json(analytics))
}

#[get("/api/students/me/attempts")]
async fn student_history(
    state: web::Data<AppState>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let history = state
        .analytics_service
        .student_history(&identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(history))
}
