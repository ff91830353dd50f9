use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::ServiceResponse,
    middleware::{ErrorHandlers, ErrorHandlerResponse, Logger as ActixLogger, NormalizePath},
    web, App, HttpServer,
};
use log::Level;

use crate::handlers::{health, interactions, reply, webhook, webmention};
use crate::http::{create_default_headers_middleware, json_error_handler};
use crate::state::AppState;

fn build_cors(state: &AppState) -> Cors {
    if !state.config.cors.enabled {
        return Cors::default().allow_any_origin().allow_any_method().allow_any_header();
    }
    let mut cors = Cors::default().allow_any_method().allow_any_header();
    for origin in &state.config.cors.origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}

fn log_response_error<B: MessageBody>(level: Level, response: &ServiceResponse<B>) {
    if let Some(error) = response.response().error() {
        log::log!(
            level,
            "{} {} : {error}",
            response.request().method(),
            response.request().path(),
        );
    }
}

/// Assembles the actix-web application and runs it, following the
/// middleware ordering and CORS/default-headers conventions from the
/// teacher's own HTTP surface.
pub async fn run_server(state: AppState) -> std::io::Result<()> {
    let http_socket_addr = state.config.http_socket_addr();
    let num_workers = std::cmp::max(num_cpus::get(), 4);
    let app_state = web::Data::new(state);

    log::info!("listening on {http_socket_addr}");
    HttpServer::new(move || {
        let cors = build_cors(&app_state);
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(cors)
            .wrap(
                ErrorHandlers::new()
                    .default_handler_client(|response| {
                        log_response_error(Level::Warn, &response);
                        Ok(ErrorHandlerResponse::Response(response.map_into_left_body()))
                    })
                    .default_handler_server(|response| {
                        log_response_error(Level::Error, &response);
                        Ok(ErrorHandlerResponse::Response(response.map_into_left_body()))
                    }),
            )
            .wrap(create_default_headers_middleware())
            .wrap(ActixLogger::new("%r : %s : %{r}a"))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::clone(&app_state))
            .service(webhook::webhook_scope())
            .service(health::health_scope())
            .service(
                web::scope("")
                    .wrap(
                        actix_web::middleware::DefaultHeaders::new()
                            .add(("Cache-Control", "no-store"))
                            .add(("Pragma", "no-cache")),
                    )
                    .service(interactions::interactions_scope())
                    .service(webmention::list_for_target)
                    .service(reply::reply_scope()),
            )
            .service(webmention::webmention_scope())
            .service(reply::reply_page_scope())
    })
    .bind(&http_socket_addr)?
    .workers(num_workers)
    .run()
    .await?;
    log::info!("server terminated");
    Ok(())
}
