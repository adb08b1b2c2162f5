use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    identity::Identity,
    models::dto::request::{NavigateRequest, SaveAnswerRequest, StartAttemptRequest},
    models::dto::response::{AttemptStartedResponse, NavigationResponse, SubmitResultResponse},
};

#[post("/api/attempts")]
async fn start_attempt(
    state: web::Data<AppState>,
    request: web::Json<StartAttemptRequest>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let started = state
        .attempt_engine
        .start_attempt(&request.test_id, &identity.user_id)
        .await?;

    Ok(HttpResponse::Created().json(AttemptStartedResponse::from(started)))
}

#[get("/api/attempts/{id}")]
async fn get_attempt_state(
    state: web::Data<AppState>,
    id: web::Path<String>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let snapshot = state
        .attempt_engine
        .session_state(&id, &identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(snapshot))
}

#[put("/api/attempts/{id}/answers")]
async fn save_answer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SaveAnswerRequest>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    state
        .attempt_engine
        .set_answer(&id, &identity.user_id, &request.question_id, &request.option_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

#[post("/api/attempts/{id}/navigation")]
async fn navigate(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<NavigateRequest>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let current_question = state
        .attempt_engine
        .navigate(&id, &identity.user_id, request.direction)
        .await?;

    Ok(HttpResponse::Ok().json(NavigationResponse { current_question }))
}

#[post("/api/attempts/{id}/submission")]
async fn submit_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .attempt_engine
        .submit(&id, &identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(SubmitResultResponse::from(outcome)))
}

#[delete("/api/attempts/{id}")]
async fn abandon_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    identity: Identity,
) -> Result<HttpResponse, AppError> {
    state
        .attempt_engine
        .abandon(&id, &identity.user_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
