/// Health check handler
use crate::app_state::AppState;
use actix_web::{web, HttpResponse};
use db_pool::acquire_with_metrics;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

async fn probe_database(state: &AppState) -> Result<(), sqlx::Error> {
    let mut conn = acquire_with_metrics(&state.db, "microblog-service").await?;
    sqlx::query("SELECT 1").execute(&mut *conn).await?;
    Ok(())
}

/// GET /health - liveness plus a database round trip
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match probe_database(&state).await {
        Ok(()) => "healthy",
        Err(err) => {
            tracing::warn!(error = %err, "Health check database probe failed");
            "unhealthy"
        }
    };

    let body = HealthResponse {
        status: if database == "healthy" { "ok" } else { "degraded" }.to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if database == "healthy" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
