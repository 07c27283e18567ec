use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use log::info;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use collab_service::event;
use collab_service::integration;
use collab_service::state::AppState;

#[tokio::main]
async fn main() {
    let config = integration::Config::default();

    let state = AppState::init(&config)
        .await
        .expect("Failed to initialize application state");

    let cors = CorsLayer::new()
        .allow_origin(config.env.allow_origin())
        .allow_methods(config.env.allow_methods())
        .allow_headers(config.env.allow_headers());

    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(event::endpoints(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = config.env.addr();
    info!("Starting server on {addr}");

    let served = match config.env.ssl_config() {
        Some(ssl) => {
            axum_server::bind_openssl(addr, ssl)
                .serve(app.into_make_service())
                .await
        }
        None => {
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await
        }
    };

    if let Err(e) = served {
        panic!("Server stopped: {e}");
    }
}
