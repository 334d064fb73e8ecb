use actix_web::{middleware::Logger, web, App, HttpServer};
use db_pool::{create_pool, DbConfig};
use microblog_service::db::run_migrations;
use microblog_service::middleware::{MetricsMiddleware, SessionMiddleware};
use microblog_service::routes::configure_routes;
use microblog_service::services::{GoogleProvider, IdentityProvider};
use microblog_service::{AppState, Config};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// MicroBlog Service
///
/// Serves the feed, accounts, posts, likes and avatars over HTTP on
/// `MICROBLOG_PORT` (default 3000).
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting microblog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_config = DbConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..DbConfig::from_env("microblog-service")
    };
    db_config.log_config();

    let db_pool = create_pool(db_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;

    run_migrations(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    tracing::info!("Database migrations applied");

    let identity_provider: Option<Arc<dyn IdentityProvider>> = match config.oauth.clone() {
        Some(oauth) => {
            tracing::info!(client_id = %oauth.client_id, "Google login enabled");
            let provider: Arc<dyn IdentityProvider> = Arc::new(GoogleProvider::new(oauth)?);
            Some(provider)
        }
        None => {
            tracing::warn!("GOOGLE_CLIENT_ID not set; /auth/google is disabled");
            None
        }
    };

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let state = AppState::new(db_pool.clone(), config, identity_provider);
    let state_data = web::Data::new(state.clone());
    let session_config = state.config.session.clone();

    tracing::info!("Starting HTTP server on {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(SessionMiddleware::new(
                db_pool.clone(),
                session_config.cookie_name.clone(),
                session_config.ttl_hours,
            ))
            .wrap(MetricsMiddleware)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    // Expired sessions, abandoned OAuth states and unclaimed registrations
    let purge_state = state.clone();
    tasks.spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purge_state.identity().purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(
                    purged,
                    "Purged expired sessions, OAuth states and pending registrations"
                ),
                Err(err) => tracing::warn!(error = %err, "Expired record purge failed"),
            }
        }
    });

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        first_error = Some(e);
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    state.db.close().await;
    tracing::info!("microblog-service shut down");

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
