mod config;

use std::net::SocketAddr;

use anyhow::bail;
use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use warden_api::{AppStateInner, TokenService};
use warden_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=debug,warden_api=debug,warden_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and bootstrap the first admin
    let db = Database::open(&config.db_path)?;
    match config.admin_password.as_deref() {
        Some(password) => {
            db.seed_admin(&config.admin_username, password)?;
        }
        None if db.count_users()? == 0 => {
            bail!("WARDEN_ADMIN_PASSWORD must be set to create the first admin account");
        }
        None => {}
    }

    let tokens = TokenService::new(&config.jwt_secret, config.access_ttl, config.refresh_ttl);
    let state = AppStateInner::new(db, tokens);

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    // Browser sessions send cookies cross-origin, so origins must be explicit.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = warden_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Warden listening on {}", addr);
    info!(
        "Token lifetimes: access {}h, refresh {}d; CORS origins: {:?}",
        config.access_ttl.num_hours(),
        config.refresh_ttl.num_days(),
        config.cors_origins
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
