//! The not-yet-emitted record of one exchange.
//!
//! A [`PendingRecord`] is created when a request enters the interceptor and
//! travels with the exchange: first inside the interceptor future, then
//! inside the response body. It submits exactly one record, either through
//! [`finish`](PendingRecord::finish) or, if whatever owns it is dropped
//! first, as an `ERROR` record marked cancelled.

use std::sync::Arc;
use std::time::Instant;

use crate::capture::body::CaptureBuffer;
use crate::capture::builder::{build_log_record, CapturedExchange};
use crate::capture::interceptor::RecordSink;
use crate::capture::request::TraceId;

/// Error message for exchanges abandoned before completion.
pub const CANCELLED: &str = "request cancelled";

pub struct PendingRecord {
    state: Option<PendingState>,
}

struct PendingState {
    exchange: CapturedExchange,
    trace_id: TraceId,
    start: Instant,
    sink: Arc<dyn RecordSink>,
    request_capture: CaptureBuffer,
}

impl PendingRecord {
    pub fn new(
        exchange: CapturedExchange,
        trace_id: TraceId,
        start: Instant,
        sink: Arc<dyn RecordSink>,
        request_capture: CaptureBuffer,
    ) -> Self {
        Self {
            state: Some(PendingState {
                exchange,
                trace_id,
                start,
                sink,
                request_capture,
            }),
        }
    }

    /// Mutable view of the exchange while the record is still open.
    pub fn exchange_mut(&mut self) -> Option<&mut CapturedExchange> {
        self.state.as_mut().map(|state| &mut state.exchange)
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_none()
    }

    /// Build and submit the record. Later calls do nothing.
    pub fn finish(&mut self, response_body: Option<String>, error_message: Option<String>) {
        let Some(state) = self.state.take() else {
            return;
        };

        let mut exchange = state.exchange;
        exchange.request_body = state.request_capture.text();
        exchange.response_body = response_body;

        let record = build_log_record(
            exchange,
            state.trace_id.as_str(),
            state.start.elapsed(),
            error_message,
        );
        tracing::trace!(trace_id = %state.trace_id, level = ?record.level, "Exchange complete");
        state.sink.submit(record);
    }
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        if let Some(state) = &self.state {
            tracing::debug!(trace_id = %state.trace_id, "Exchange dropped before completion");
        }
        self.finish(None, Some(CANCELLED.to_string()));
    }
}
