use std::{
    sync::Arc,
    task::{Context as TaskContext, Poll},
    time::Duration,
};

use axum::{
    extract::MatchedPath,
    http::{HeaderValue, Request, Response, header::HeaderName},
};
use tower::{Layer, Service};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::{Level, Span, event, field, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::handlers::headers::HEADER_REQUEST_ID;

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// Custom response logger that escalates log level for 4xx/5xx responses.
pub fn response_logger() -> ResponseLogger {
    ResponseLogger
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseLogger;

impl<B> OnResponse<B> for ResponseLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record(
            "http.response.status_code",
            field::display(status.as_u16()),
        );

        let latency_ms = latency.as_millis() as u64;
        if status.is_server_error() {
            event!(
                parent: span,
                Level::ERROR,
                http.response.status_code = status.as_u16(),
                latency_ms,
                "request completed"
            );
        } else if status.is_client_error() {
            event!(
                parent: span,
                Level::WARN,
                http.response.status_code = status.as_u16(),
                latency_ms,
                "request completed"
            );
        } else {
            event!(
                parent: span,
                Level::INFO,
                http.response.status_code = status.as_u16(),
                latency_ms,
                "request completed"
            );
        }
    }
}

#[derive(Clone, Debug)]
pub struct RequestContext {
    request_id: Arc<str>,
}

impl RequestContext {
    fn new(request_id: String) -> Self {
        Self {
            request_id: Arc::from(request_id),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

pub fn request_context_layer() -> RequestContextLayer {
    RequestContextLayer
}

/// Ensures every request carries an `x-request-id`, generating one when the
/// client did not send it.
#[derive(Clone, Copy, Default)]
pub struct RequestContextLayer;

#[derive(Clone)]
pub struct RequestContextMiddleware<S> {
    inner: S,
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextMiddleware { inner }
    }
}

impl<S, B> Service<Request<B>> for RequestContextMiddleware<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let request_id = request
            .headers()
            .get(HEADER_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);

        let request_id = match request_id {
            Some(id) => id,
            None => {
                let generated = Uuid::new_v4().to_string();
                if let Ok(header_value) = HeaderValue::from_str(&generated) {
                    request
                        .headers_mut()
                        .insert(HeaderName::from_static(HEADER_REQUEST_ID), header_value);
                }
                generated
            }
        };

        request
            .extensions_mut()
            .insert(RequestContext::new(request_id));

        self.inner.call(request)
    }
}

pub fn http_make_span() -> HttpMakeSpan {
    HttpMakeSpan
}

#[derive(Clone, Copy, Default)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id().to_owned())
            .unwrap_or_else(|| "unknown".to_string());
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_else(|| request.uri().path().to_owned());

        info_span!(
            "http",
            method = %request.method(),
            route = %route,
            request_id = %request_id,
            http.response.status_code = field::Empty,
        )
    }
}
