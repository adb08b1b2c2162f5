use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use examroom_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(err) => {
            log::error!("failed to initialise application state: {}", err);
            std::process::exit(1);
        }
    };

    log::info!("starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .service(handlers::start_attempt)
            .service(handlers::get_attempt_state)
            .service(handlers::save_answer)
            .service(handlers::navigate)
            .service(handlers::submit_attempt)
            .service(handlers::abandon_attempt)
            .service(handlers::test_analytics)
            .service(handlers::student_history)
            .service(handlers::health_check)
    })
    .bind((host, port))?
    .run()
    .await
}
