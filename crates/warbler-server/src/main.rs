use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use warbler_api::service::Warbler;
use warbler_api::{AppState, AppStateInner};

/// Secrets shipped in sample env files. Refuse to sign tokens with them.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const MAX_TOKEN_TTL_DAYS: i64 = 3650;

struct Config {
    db_path: PathBuf,
    host: String,
    port: u16,
    jwt_secret: String,
    token_ttl_days: i64,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("WARBLER_JWT_SECRET").unwrap_or_default();
        check_secret(&jwt_secret)?;

        let db_path = std::env::var("WARBLER_DB_PATH").unwrap_or_else(|_| "warbler.db".into());
        let host = std::env::var("WARBLER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("WARBLER_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("WARBLER_PORT must be a port number")?;
        let token_ttl_days = parse_ttl_days(
            &std::env::var("WARBLER_TOKEN_TTL_DAYS").unwrap_or_else(|_| "30".into()),
        )?;

        Ok(Self {
            db_path: PathBuf::from(db_path),
            host,
            port,
            jwt_secret,
            token_ttl_days,
        })
    }
}

/// Token lifetime in days, between one day and ten years.
fn parse_ttl_days(raw: &str) -> anyhow::Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .context("WARBLER_TOKEN_TTL_DAYS must be a whole number of days")?;
    if !(1..=MAX_TOKEN_TTL_DAYS).contains(&days) {
        bail!("WARBLER_TOKEN_TTL_DAYS must be between 1 and {}, got {}", MAX_TOKEN_TTL_DAYS, days);
    }
    Ok(days)
}

fn check_secret(secret: &str) -> anyhow::Result<()> {
    if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret) {
        bail!("WARBLER_JWT_SECRET is unset or still a placeholder; set it in your .env file and restart");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warbler=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = warbler_db::Database::open(&config.db_path)
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;

    let state: AppState = Arc::new(AppStateInner {
        warbler: Warbler::new(db),
        jwt_secret: config.jwt_secret,
        token_ttl_days: config.token_ttl_days,
    });

    let app = warbler_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Warbler listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
