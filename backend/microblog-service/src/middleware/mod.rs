/// HTTP middleware for microblog-service
///
/// - `SessionMiddleware` resolves the session cookie into a `CurrentSession`
///   stored in request extensions
/// - `AuthUser` / `SessionToken` extract it in handlers
/// - `MetricsMiddleware` records per-route request counters and latency
use crate::error::AppError;
use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use crate::models::User;
use crate::services::{CurrentSession, IdentityService};
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use sqlx::SqlitePool;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::time::Instant;

// =====================================================================
// Session resolution
// =====================================================================

/// Resolves the session cookie on every request
///
/// Lookup failures are logged and the request continues as anonymous.
#[derive(Clone)]
pub struct SessionMiddleware {
    pool: SqlitePool,
    cookie_name: String,
    session_ttl_hours: i64,
}

impl SessionMiddleware {
    pub fn new(pool: SqlitePool, cookie_name: impl Into<String>, session_ttl_hours: i64) -> Self {
        Self {
            pool,
            cookie_name: cookie_name.into(),
            session_ttl_hours,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            config: self.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    config: SessionMiddleware,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let token = req
            .cookie(&self.config.cookie_name)
            .map(|c| c.value().to_string());
        let identity =
            IdentityService::new(self.config.pool.clone(), self.config.session_ttl_hours);

        Box::pin(async move {
            match identity.resolve_session(token.as_deref()).await {
                Ok(Some(current)) => {
                    req.extensions_mut().insert(current);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Session lookup failed; treating request as anonymous");
                }
            }

            service.call(req).await
        })
    }
}

fn current_session(req: &HttpRequest) -> Option<CurrentSession> {
    req.extensions().get::<CurrentSession>().cloned()
}

/// The logged-in user; anonymous callers are redirected to `/login`
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            current_session(req)
                .and_then(|c| c.user)
                .map(AuthUser)
                .ok_or(AppError::LoginRequired),
        )
    }
}

/// The caller's resolved session (anonymous or not), if any
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<CurrentSession>);

impl SessionToken {
    pub fn token(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.session.token.as_str())
    }
}

impl FromRequest for SessionToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(SessionToken(current_session(req))))
    }
}

// =====================================================================
// Metrics middleware
// =====================================================================

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let method = req.method().to_string();
        // Route patterns keep label cardinality bounded (`/like/{id}`, not `/like/42`)
        let route = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());
        let start = Instant::now();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed = start.elapsed();

            let status = match &res {
                Ok(response) => response.status().as_u16().to_string(),
                Err(err) => err.as_response_error().status_code().as_u16().to_string(),
            };
            HTTP_REQUESTS_TOTAL
                .with_label_values(&[&method, &route, &status])
                .inc();
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&[&method, &route])
                .observe(elapsed.as_secs_f64());
            tracing::debug!(%method, %route, %status, elapsed_ms = elapsed.as_millis() as u64, "request completed");

            res
        })
    }
}
