//! mcpedia server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `MCPEDIA_*` environment variables, opens the SQLite store and serves MCP
//! over HTTP. The `lock` and `unlock` subcommands toggle the store's write
//! lock and exit.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use mcpedia_core::KnowledgeStore;
use mcpedia_server::{AppState, ServerConfig};
use mcpedia_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "MCPedia knowledge server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve MCP over HTTP (the default).
  Serve,
  /// Disable all writes until unlocked with the same token.
  Lock {
    #[arg(long, env = "MCPEDIA_LOCK_TOKEN", hide_env_values = true)]
    token: String,
  },
  /// Re-enable writes.
  Unlock {
    #[arg(long, env = "MCPEDIA_LOCK_TOKEN", hide_env_values = true)]
    token: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MCPEDIA").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_deadline(server_cfg.storage_timeout());

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, server_cfg).await,
    Command::Lock { token } => {
      store
        .lock(&token)
        .await
        .map_err(mcpedia_core::Error::from)
        .context("failed to lock the store")?;
      println!("store at {} is now locked", store_path.display());
      Ok(())
    }
    Command::Unlock { token } => {
      store
        .unlock(&token)
        .await
        .map_err(mcpedia_core::Error::from)
        .context("failed to unlock the store")?;
      println!("store at {} is now unlocked", store_path.display());
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, config: ServerConfig) -> anyhow::Result<()> {
  let address = format!("{}:{}", config.host, config.port);
  if config.token.as_deref().is_none_or(str::is_empty) {
    tracing::warn!("no token configured; the endpoint is unauthenticated");
  }

  let app = mcpedia_server::router(AppState::new(store, config));

  tracing::info!("Listening on http://{address}/mcp");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
