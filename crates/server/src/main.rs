use std::path::PathBuf;
use std::sync::Arc;

use actix_web::middleware::Condition;
use actix_web::{web, App, HttpResponse, HttpServer};
use clap::Parser;
use server::{config, routes, shutdown, wire};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oas-server", about = "Self-hosted Atlas-dialect search service")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "OAS_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).json().init();

    let build = build_info::BuildInfo::from_build();
    info!(commit = ?build.commit_sha1, describe = ?build.describe, "starting");

    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    let bind_addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let server_cfg = Arc::new(cfg.server.clone());
    let auth_enabled = cfg.server.auth_enabled();
    let metrics_enabled = cfg.search.metrics_enabled;

    let running = wire(&cfg).await?;
    let state = running.state.clone();

    let http_server = HttpServer::new(move || {
        let authenticated = web::scope("")
            .wrap(Condition::new(auth_enabled, server::auth::middleware(server_cfg.clone())))
            .service(routes::indexes::list_indexes)
            .service(routes::indexes::index_status)
            .service(routes::indexes::index_mapping)
            .service(routes::indexes::search)
            .service(routes::ready::ready)
            .route("/metrics", web::get().to(metrics_handler));

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(MetricsEnabled(metrics_enabled)))
            .service(routes::health::health)
            .service(authenticated)
    })
    .bind(bind_addr)?
    .run();

    let server_handle = http_server.handle();
    tokio::spawn(http_server);

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");
    server_handle.stop(true).await;
    shutdown(running).await;

    Ok(())
}

#[derive(Clone, Copy)]
struct MetricsEnabled(bool);

async fn metrics_handler(enabled: web::Data<MetricsEnabled>) -> HttpResponse {
    if !enabled.0 {
        return HttpResponse::NotFound().finish();
    }
    HttpResponse::Ok().content_type("text/plain; version=0.0.4").body(server::metrics::render())
}
