mod server;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use gitlab_docs_mcp::config::DocsConfig;
use gitlab_docs_mcp::mcp::DocsContext;
use gitlab_docs_mcp::search::SearchIndex;

#[derive(Parser, Debug)]
#[command(version, about = "GitLab Documentation MCP Server")]
struct Cli {
    /// Type of server to run
    #[arg(short, long, value_enum, default_value_t = ServerType::Stdio)]
    server_type: ServerType,

    /// Address for the SSE server
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    address: String,

    #[command(flatten)]
    config: DocsConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ServerType {
    /// Start an SSE server
    Sse,
    /// Start a stdio server
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    server::init_tracing(cli.server_type == ServerType::Stdio);

    tracing::info!("Loading search index from {:?}", cli.config.index_path);
    let index = SearchIndex::load(&cli.config.index_path).await.inspect_err(|e| {
        tracing::error!("Failed to load search index: {}", e);
    })?;

    let context = Arc::new(DocsContext::new(
        index,
        cli.config.cache_options(),
        cli.config.min_score,
    ));
    tracing::info!(
        "Loaded {} documents in {} sections",
        context.index.document_count(),
        context.tree.section_count()
    );

    match cli.server_type {
        ServerType::Sse => server::start_sse_server(&cli.address, context).await?,
        ServerType::Stdio => server::start_stdio_server(context).await?,
    }

    Ok(())
}
