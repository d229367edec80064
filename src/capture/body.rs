//! Body capture for logging.
//!
//! # Responsibilities
//! - Tee the request body into a bounded buffer while the handler reads it
//! - Tee the response body the same way on its way to the client
//! - Emit the exchange's record once the response stream is over
//!
//! # Design Decisions
//! - Both streams pass through unmodified; only the logged copy is capped
//!   at [`MAX_CAPTURE_BYTES`]
//! - Nothing is held back from the client, so streaming responses flow
//!   as they are produced

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use hyper::body::{Body as HttpBody, Frame, SizeHint};

use crate::capture::pending::{PendingRecord, CANCELLED};

/// Most bytes retained for logging per direction (1 MiB).
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Shared view of whatever a [`CapturingBody`] has seen so far.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    fn append(&self, chunk: &[u8]) {
        let mut buffer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = MAX_CAPTURE_BYTES.saturating_sub(buffer.len());
        if remaining > 0 {
            let take = chunk.len().min(remaining);
            buffer.extend_from_slice(&chunk[..take]);
        }
    }

    /// Captured bytes as text, `None` if nothing was read.
    pub fn text(&self) -> Option<String> {
        let buffer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        captured_text(&buffer)
    }
}

/// Request body wrapper that records data frames as they stream past.
pub struct CapturingBody {
    inner: Body,
    buffer: CaptureBuffer,
}

impl CapturingBody {
    pub fn wrap(inner: Body) -> (Body, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        let body = Self {
            inner,
            buffer: buffer.clone(),
        };
        (Body::new(body), buffer)
    }
}

impl HttpBody for CapturingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &polled {
            if let Some(data) = frame.data_ref() {
                self.buffer.append(data);
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Response body wrapper that tees frames into a capped buffer and emits
/// the exchange's record when the stream ends, fails or is dropped.
///
/// Frames and errors pass through untouched, so the client sees exactly
/// what it would see without the interceptor.
pub struct CapturingResponseBody {
    inner: Body,
    captured: Vec<u8>,
    pending: PendingRecord,
    /// HEAD responses are never polled; dropping them is a normal end.
    head: bool,
}

impl CapturingResponseBody {
    pub fn wrap(inner: Body, pending: PendingRecord, head: bool) -> Body {
        let mut body = Self {
            inner,
            captured: Vec::new(),
            pending,
            head,
        };
        if body.inner.is_end_stream() {
            body.complete();
        }
        Body::new(body)
    }

    fn append(&mut self, chunk: &[u8]) {
        let remaining = MAX_CAPTURE_BYTES.saturating_sub(self.captured.len());
        let take = chunk.len().min(remaining);
        self.captured.extend_from_slice(&chunk[..take]);
    }

    fn complete(&mut self) {
        let text = captured_text(&self.captured);
        self.pending.finish(text, None);
    }

    fn fail(&mut self, message: String) {
        let text = captured_text(&self.captured);
        self.pending.finish(text, Some(message));
    }
}

impl HttpBody for CapturingResponseBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    self.append(data);
                }
                if self.inner.is_end_stream() {
                    self.complete();
                }
            }
            Poll::Ready(Some(Err(e))) => {
                let message = format!("response body error: {e}");
                self.fail(message);
            }
            Poll::Ready(None) => self.complete(),
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CapturingResponseBody {
    fn drop(&mut self) {
        if self.pending.is_finished() {
            return;
        }
        if self.head || self.inner.is_end_stream() {
            self.complete();
        } else {
            self.fail(CANCELLED.to_string());
        }
    }
}

fn captured_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::builder::CapturedExchange;
    use crate::capture::interceptor::RecordSink;
    use crate::capture::record::{LogLevel, LogRecord};
    use crate::capture::request::TraceId;
    use futures_util::stream;
    use std::time::Instant;

    #[tokio::test]
    async fn handler_sees_full_body_and_capture_is_recorded() {
        let (body, capture) = CapturingBody::wrap(Body::from("hello world"));
        assert!(capture.text().is_none());

        let read = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&read[..], b"hello world");
        assert_eq!(capture.text().as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn capture_is_capped_but_stream_is_not() {
        let payload = vec![b'a'; MAX_CAPTURE_BYTES + 10];
        let (body, capture) = CapturingBody::wrap(Body::from(payload));

        let read = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(read.len(), MAX_CAPTURE_BYTES + 10);
        assert_eq!(capture.text().unwrap().len(), MAX_CAPTURE_BYTES);
    }

    #[tokio::test]
    async fn unread_body_captures_nothing() {
        let (_body, capture) = CapturingBody::wrap(Body::from("ignored"));
        assert!(capture.text().is_none());
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LogRecord>>);

    impl RecordSink for Recorder {
        fn submit(&self, record: LogRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    impl Recorder {
        fn records(&self) -> Vec<LogRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    fn response_body(inner: Body, recorder: &Arc<Recorder>) -> Body {
        let pending = PendingRecord::new(
            CapturedExchange::default(),
            TraceId::generate(),
            Instant::now(),
            recorder.clone(),
            CaptureBuffer::default(),
        );
        CapturingResponseBody::wrap(inner, pending, false)
    }

    #[tokio::test]
    async fn record_emitted_when_response_is_read() {
        let recorder = Arc::new(Recorder::default());
        let body = response_body(Body::from("created"), &recorder);
        assert!(recorder.records().is_empty());

        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"created");

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[0].response_body.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn empty_response_is_recorded_immediately() {
        let recorder = Arc::new(Recorder::default());
        let _body = response_body(Body::empty(), &recorder);

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].response_body.is_none());
        assert!(records[0].error_message.is_none());
    }

    #[tokio::test]
    async fn oversized_response_logged_truncated_but_delivered_whole() {
        let recorder = Arc::new(Recorder::default());
        let payload = vec![b'z'; MAX_CAPTURE_BYTES * 2];
        let body = response_body(Body::from(payload), &recorder);

        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(bytes.len(), MAX_CAPTURE_BYTES * 2);
        let records = recorder.records();
        assert_eq!(records[0].response_body.as_ref().unwrap().len(), MAX_CAPTURE_BYTES);
    }

    #[tokio::test]
    async fn failing_response_stream_reaches_client_and_record() {
        let recorder = Arc::new(Recorder::default());
        let chunks = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("upstream reset")),
        ]);
        let body = response_body(Body::from_stream(chunks), &recorder);

        let err = axum::body::to_bytes(body, usize::MAX).await.unwrap_err();
        assert!(err.to_string().contains("upstream reset"));

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Error);
        assert_eq!(records[0].response_body.as_deref(), Some("partial"));
        assert!(records[0]
            .error_message
            .as_deref()
            .is_some_and(|message| message.contains("upstream reset")));
    }

    #[tokio::test]
    async fn abandoned_stream_is_recorded_as_cancelled() {
        let recorder = Arc::new(Recorder::default());
        let chunks = stream::repeat_with(|| Ok::<_, std::io::Error>(Bytes::from_static(b"tick")));
        let mut body = response_body(Body::from_stream(chunks), &recorder);

        let frame = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"tick"));
        assert!(recorder.records().is_empty());
        drop(body);

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error_message.as_deref(), Some(CANCELLED));
        assert_eq!(records[0].response_body.as_deref(), Some("tick"));
    }

    #[tokio::test]
    async fn dropped_head_response_is_not_an_error() {
        let recorder = Arc::new(Recorder::default());
        let pending = PendingRecord::new(
            CapturedExchange::default(),
            TraceId::generate(),
            Instant::now(),
            recorder.clone(),
            CaptureBuffer::default(),
        );
        drop(CapturingResponseBody::wrap(Body::from("unsent"), pending, true));

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Info);
    }
}
