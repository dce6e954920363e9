pub mod agent;
pub mod cache;
pub mod cli;
pub mod cms;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod server;

use agent::PostAgent;
use cli::Args;
use log::info;
use pipeline::{ PipelineResponse, PostRequest };
use server::Server;
use std::error::Error;
use std::sync::Arc;

fn log_configuration(args: &Args) {
    info!("--- Core Configuration ---");
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Image Model: {}", args.image_model);
    info!("History Store Type: {}", args.history_type);
    info!("History Store Host: {}", args.history_host);
    info!("History Limit: {}", args.history_limit);
    info!("Image Cache Type: {}", args.cache_type);
    if args.cache_type.eq_ignore_ascii_case("redis") {
        info!("Image Cache Redis URL: {}", args.cache_redis_url);
    }
    info!("CMS URI: {}", args.blogger_uri);
    info!("Prompts Path: {}", args.prompts_path);
    info!("Cover Marker: {}", args.cover_marker);
    info!("Max Images: {}", args.max_images);
    info!("Site UTC Offset: {}h", args.site_utc_offset_hours);
    info!("Replay Last Response: {}", args.replay_last_response);
    match args.category_id {
        Some(id) => info!("Mode: one-shot for category {}", id),
        None => info!("Mode: HTTP server on {}", args.server_addr),
    }
    info!("-------------------------");
}

/// Runs once for `--category-id`, otherwise serves the HTTP API.
pub async fn run(args: Args) -> Result<Option<PipelineResponse>, Box<dyn Error + Send + Sync>> {
    log_configuration(&args);

    let agent = Arc::new(PostAgent::new(args.clone()).await?);

    if let Some(category_id) = args.category_id {
        let response = agent.generate(PostRequest { category_id }).await;
        return Ok(Some(response));
    }

    let addr = args.server_addr.clone();
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(None)
}
