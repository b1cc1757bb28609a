//! `keeper`: command-line client for The Keeper.
//!
//! # Usage
//!
//! ```text
//! keeper --url http://localhost:8787 --email admin@hexaware.com --password password123 login
//! keeper --config ~/.config/keeper/config.toml open /admin-dashboard
//! keeper signup --full-name "Ada Lovelace"
//! keeper routes
//! ```

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use keeper_client::{HttpBackend, HttpConfig, report};
use keeper_core::{
  dashboard::DashboardView,
  profile::ProfileSeed,
  routes::{RouteTable, landing_path},
};
use keeper_session::{GatewayConfig, IdentityGateway, Notice, SessionStore};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:8787";

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "keeper", about = "Command-line client for The Keeper")]
struct Args {
  /// Path to a TOML config file (url, email, password, timeout_secs).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the keeper server (default: http://127.0.0.1:8787).
  #[arg(long, env = "KEEPER_URL")]
  url: Option<String>,

  /// Account email address.
  #[arg(long, env = "KEEPER_EMAIL")]
  email: Option<String>,

  /// Account password (plaintext).
  #[arg(long, env = "KEEPER_PASSWORD")]
  password: Option<String>,

  /// Upper bound on each identity call, in seconds.
  #[arg(long)]
  timeout_secs: Option<u64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sign in and show your profile and dashboard.
  Login,
  /// Register a new account and create its profile.
  Signup {
    #[arg(long)]
    full_name:         Option<String>,
    #[arg(long)]
    employee_id:       Option<String>,
    #[arg(long)]
    department:        Option<String>,
    #[arg(long)]
    phone:             Option<String>,
    #[arg(long)]
    emergency_contact: Option<String>,
  },
  /// Sign in, then navigate to PATH as the route guard would.
  Open { path: String },
  /// Print the route table.
  Routes,
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  #[serde(default)]
  email:        String,
  #[serde(default)]
  password:     String,
  #[serde(default)]
  timeout_secs: Option<u64>,
}

struct Settings {
  url:      String,
  email:    Option<String>,
  password: Option<String>,
  gateway:  GatewayConfig,
}

impl Settings {
  fn credentials(&self) -> Result<(&str, &str)> {
    match (&self.email, &self.password) {
      (Some(email), Some(password)) => Ok((email, password)),
      _ => bail!("an email and password are required (--email/--password or KEEPER_EMAIL/KEEPER_PASSWORD)"),
    }
  }
}

fn non_empty(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let mut gateway = GatewayConfig::default();
  if let Some(secs) = args.timeout_secs.or(file_cfg.timeout_secs) {
    gateway.timeout = Duration::from_secs(secs);
  }
  let settings = Settings {
    url: args
      .url
      .or_else(|| non_empty(file_cfg.url))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    email: args.email.or_else(|| non_empty(file_cfg.email)),
    password: args.password.or_else(|| non_empty(file_cfg.password)),
    gateway,
  };

  match args.command {
    Command::Routes => {
      print!("{}", report::routes(RouteTable::standard().routes()));
      Ok(())
    }
    Command::Login => login(&settings).await,
    Command::Open { path } => open(&settings, &path).await,
    Command::Signup { full_name, employee_id, department, phone, emergency_contact } => {
      let seed = ProfileSeed {
        full_name,
        employee_id,
        department,
        phone,
        emergency_contact,
        ..ProfileSeed::default()
      };
      signup(&settings, seed).await
    }
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn connect(settings: &Settings) -> Result<SessionStore<HttpBackend>> {
  let backend = HttpBackend::new(HttpConfig::new(&settings.url))
    .context("failed to build HTTP client")?;
  let gateway = IdentityGateway::with_config(backend, settings.gateway);
  Ok(SessionStore::start(gateway).await)
}

fn print_notices(notices: &mut broadcast::Receiver<Notice>) {
  while let Ok(notice) = notices.try_recv() {
    eprintln!("{notice}");
  }
}

async fn sign_in(settings: &Settings) -> Result<SessionStore<HttpBackend>> {
  let (email, password) = settings.credentials()?;
  let store = connect(settings).await?;
  let mut notices = store.notices();
  let result = store.sign_in(email, password).await;
  print_notices(&mut notices);
  result.map_err(|e| anyhow!("sign-in failed: {e}"))?;
  store.settled().await;
  print_notices(&mut notices);
  Ok(store)
}

async fn login(settings: &Settings) -> Result<()> {
  let store = sign_in(settings).await?;
  let state = store.snapshot();
  match &state.profile {
    Some(profile) => print!("{}", report::profile(profile)),
    None => println!("Signed in without a profile."),
  }
  if let Some(path) = landing_path(&state) {
    println!("Dashboard:   {path}");
  }
  store.sign_out().await;
  Ok(())
}

async fn open(settings: &Settings, path: &str) -> Result<()> {
  let store = sign_in(settings).await?;
  let routes = RouteTable::standard();
  println!("{}", report::navigation(&store.navigate(&routes, path)));
  println!("{}", report::dashboard(DashboardView::for_state(&store.snapshot())));
  store.sign_out().await;
  Ok(())
}

async fn signup(settings: &Settings, seed: ProfileSeed) -> Result<()> {
  let (email, password) = settings.credentials()?;
  let store = connect(settings).await?;
  let mut notices = store.notices();
  let result = store.sign_up(email, password, seed).await;
  print_notices(&mut notices);
  result.map_err(|e| anyhow!("registration failed: {e}"))?;

  let state = store.settled().await;
  print_notices(&mut notices);
  match &state.profile {
    Some(profile) => print!("{}", report::profile(profile)),
    None => println!("Registered {email}; no profile yet."),
  }
  store.sign_out().await;
  Ok(())
}
