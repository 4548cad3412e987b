use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::sse_server::SseServer;
use rmcp::transport::stdio;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt};

use gitlab_docs_mcp::mcp::{DocsContext, DocsServer};

// stdout carries the protocol in stdio mode, so logs go to stderr there
pub fn init_tracing(stdio_mode: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".to_string().into());

    if stdio_mode {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

// start sse server
pub async fn start_sse_server(addr: &str, context: Arc<DocsContext>) -> anyhow::Result<()> {
    tracing::info!("Starting SSE server on {}", addr);

    let service_context = context.clone();
    let ct = SseServer::serve(addr.parse()?)
        .await?
        .with_service(move || DocsServer::new(service_context.clone()));

    tokio::signal::ctrl_c().await?;
    ct.cancel();

    log_performance(&context).await;
    Ok(())
}

// start stdio server
pub async fn start_stdio_server(context: Arc<DocsContext>) -> anyhow::Result<()> {
    tracing::info!("Starting MCP server on stdio");

    let service = DocsServer::new(context.clone())
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })?;

    service.waiting().await?;

    log_performance(&context).await;
    Ok(())
}

async fn log_performance(context: &DocsContext) {
    for (operation, stats) in context.performance_summary().await {
        tracing::info!(
            "{}: {} calls ({} failed), avg {:?}, min {:?}, max {:?}",
            operation,
            stats.count,
            stats.failures,
            stats.avg,
            stats.min,
            stats.max
        );
    }
}
