//! keeper-server binary.
//!
//! Reads `keeper.toml` (or the path given with `--config`) layered with
//! `KEEPER_*` environment variables, opens the SQLite store, optionally seeds
//! the demo accounts, and serves the identity API over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use keeper_server::{AppState, ServerConfig};
use keeper_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "The Keeper identity server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "keeper.toml")]
  config: PathBuf,

  /// Seed the demo accounts, whatever the configuration says.
  #[arg(long)]
  seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("KEEPER"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.seed_demo_accounts |= cli.seed_demo;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_session_ttl(chrono::Duration::seconds(server_cfg.session_ttl_secs));

  if server_cfg.seed_demo_accounts {
    store
      .seed_demo_accounts()
      .await
      .context("failed to seed demo accounts")?;
  }
  store
    .purge_expired_sessions()
    .await
    .context("failed to purge expired sessions")?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = keeper_server::router(AppState::new(store, server_cfg));

  tracing::info!("Listening on http://{address}");
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
