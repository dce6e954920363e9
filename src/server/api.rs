use crate::agent::PostAgent;
use crate::cli::Args;
use crate::pipeline::PostRequest;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::post,
    Router,
    extract::State,
    response::{ IntoResponse, Response },
    http::{ HeaderMap, StatusCode },
    Json,
};
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::info;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
struct AppState {
    agent: Arc<PostAgent>,
    api_key: Option<String>,
}

pub fn router(agent: Arc<PostAgent>, api_key: Option<String>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app_state = AppState {
        agent,
        api_key: api_key.filter(|k| !k.is_empty()),
    };

    Router::new()
        .route("/api/posts", post(create_post_handler))
        .layer(cors)
        .with_state(app_state)
}

pub async fn start_http_server(
    addr: &str,
    agent: Arc<PostAgent>,
    args: &Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(agent, args.server_api_key.clone());

    match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;
            info!("Starting HTTPS API server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
        }
        _ => {
            let listener = tokio::net::TcpListener
                ::bind(addr).await
                .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;
            info!("Starting HTTP API server on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    match &state.api_key {
        None => true,
        Some(expected) =>
            headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|provided| provided == expected)
                .unwrap_or(false),
    }
}

async fn create_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PostRequest>
) -> Response {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid API key" }))).into_response();
    }

    let response = state.agent.generate(req).await;
    let code = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(response.body)).into_response()
}
