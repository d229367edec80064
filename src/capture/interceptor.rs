//! Request interception layer.
//!
//! Wraps any `Service<Request<Body>, Response = Response<Body>>` and emits
//! exactly one [`LogRecord`] per non-bypassed call. The wrapped service is
//! always called exactly once and its result is returned unchanged, apart
//! from an `X-Trace-Id` response header added when the handler did not set
//! its own.
//!
//! The record is emitted when the response body has been sent, when the
//! handler returns `Err` or panics (the panic is resumed afterwards), or
//! when the exchange is dropped early, in which case it is marked cancelled.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tower::{Layer, Service};

use crate::capture::body::{CapturingBody, CapturingResponseBody};
use crate::capture::builder::CapturedExchange;
use crate::capture::pending::PendingRecord;
use crate::capture::record::LogRecord;
use crate::capture::request::{
    client_ip, path_with_query, user_agent, AuthenticatedUser, BypassRules, TraceId, X_TRACE_ID,
};

/// Destination for finished records.
///
/// Implementations must return immediately; the interceptor calls this on
/// the request path.
pub trait RecordSink: Send + Sync {
    fn submit(&self, record: LogRecord);
}

/// Layer that installs [`RequestLogService`].
#[derive(Clone)]
pub struct RequestLogLayer {
    sink: Arc<dyn RecordSink>,
    bypass: Arc<BypassRules>,
}

impl RequestLogLayer {
    pub fn new(sink: Arc<dyn RecordSink>, bypass: BypassRules) -> Self {
        Self {
            sink,
            bypass: Arc::new(bypass),
        }
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            sink: Arc::clone(&self.sink),
            bypass: Arc::clone(&self.bypass),
        }
    }
}

/// Service produced by [`RequestLogLayer`].
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
    sink: Arc<dyn RecordSink>,
    bypass: Arc<BypassRules>,
}

impl<S> Service<Request<Body>> for RequestLogService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        // The clone may not be ready; keep the instance that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.bypass.matches(request.uri().path()) {
            return Box::pin(inner.call(request));
        }

        let start = Instant::now();

        let trace_id = TraceId::resolve(request.headers());
        let trace_header = HeaderValue::from_str(trace_id.as_str()).ok();
        if let Some(value) = &trace_header {
            request.headers_mut().insert(X_TRACE_ID.clone(), value.clone());
        }
        request.extensions_mut().insert(trace_id.clone());

        let head = request.method() == Method::HEAD;
        let exchange = CapturedExchange {
            method: request.method().to_string(),
            path: path_with_query(request.uri()),
            user_id: request
                .extensions()
                .get::<AuthenticatedUser>()
                .map(|user| user.0.clone()),
            ip_address: client_ip(&request),
            user_agent: user_agent(request.headers()),
            ..Default::default()
        };

        let (parts, body) = request.into_parts();
        let (body, request_capture) = CapturingBody::wrap(body);
        let request = Request::from_parts(parts, body);

        tracing::trace!(trace_id = %trace_id, path = %exchange.path, "Capturing request");

        // Dropping this future before the handler returns drops `pending`,
        // which records the exchange as cancelled.
        let mut pending = PendingRecord::new(
            exchange,
            trace_id,
            start,
            Arc::clone(&self.sink),
            request_capture,
        );

        Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { inner.call(request).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(response)) => {
                    let (mut parts, body) = response.into_parts();
                    if let Some(exchange) = pending.exchange_mut() {
                        exchange.status_code = Some(parts.status.as_u16());
                        if exchange.user_id.is_none() {
                            exchange.user_id = parts
                                .extensions
                                .get::<AuthenticatedUser>()
                                .map(|user| user.0.clone());
                        }
                    }
                    if let Some(value) = trace_header {
                        parts.headers.entry(X_TRACE_ID.clone()).or_insert(value);
                    }

                    let body = CapturingResponseBody::wrap(body, pending, head);
                    Ok(Response::from_parts(parts, body))
                }
                Ok(Err(error)) => {
                    pending.finish(None, Some(error.to_string()));
                    Err(error)
                }
                Err(payload) => {
                    pending.finish(None, Some(panic_message(payload.as_ref())));
                    panic::resume_unwind(payload)
                }
            }
        })
    }
}

/// Text of a panic payload, as printed by the default hook.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}
