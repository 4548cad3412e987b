use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gitlab_docs_mcp::build::{DEFAULT_DOCS_REPO_PATH, IndexBuilder};
use gitlab_docs_mcp::config::DEFAULT_INDEX_PATH;

#[derive(Parser, Debug)]
#[command(version, about = "Build the GitLab documentation search index")]
struct Cli {
    /// Root of the documentation markdown tree (the repository's `doc` directory)
    #[arg(long, env = "GITLAB_DOCS_REPO_PATH", default_value = DEFAULT_DOCS_REPO_PATH)]
    source: PathBuf,

    /// Directory to write index_meta.json and documents.json into
    #[arg(long, env = "GITLAB_DOCS_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .init();

    let cli = Cli::parse();
    if !cli.source.is_dir() {
        anyhow::bail!(
            "Documentation source not found at {}. Clone the GitLab repository there or pass --source.",
            cli.source.display()
        );
    }

    tracing::info!("Building index from {:?} into {:?}", cli.source, cli.output);
    let report = IndexBuilder::default()
        .build_and_write(&cli.source, &cli.output)
        .with_context(|| format!("building index into {}", cli.output.display()))?;

    tracing::info!(
        "Processed {} files ({} chunked, {} skipped)",
        report.files,
        report.chunked,
        report.skipped
    );
    Ok(())
}
