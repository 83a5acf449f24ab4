#[cfg(not(windows))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use raptor_search::config::{Opt, ServiceConfig};
use raptor_search::http;
use raptor_search::IndexService;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let opt = Opt::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&opt.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config: ServiceConfig = opt.into();
    let listen_addr = config.listen_addr.clone();
    let service = IndexService::new(config);

    tracing::info!(addr = %listen_addr, "starting raptor-search");

    let server = HttpServer::new({
        let service = service.clone();
        move || {
            App::new()
                .app_data(web::Data::new(service.clone()))
                .wrap(Cors::permissive())
                .configure(http::configure)
        }
    })
    .bind(&listen_addr)?
    .run();

    let server_handle = server.handle();
    let shutdown = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, draining in-flight requests");
        server_handle.stop(true).await;
    });

    server.await?;
    let _ = shutdown.await;
    service.shutdown();
    Ok(())
}

/// Mirrors the original's `router.go` graceful-shutdown hook: wait for SIGINT, or SIGTERM on
/// Unix, then let the caller drain the HTTP server and close every backend.
async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
