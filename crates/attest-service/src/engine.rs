//! Extractor engine.
//!
//! Feature extraction may block for the length of a model inference, so
//! each request runs on the runtime's blocking thread pool. Requests
//! for different images run in parallel — one slow extraction never
//! queues the others — and the timeout bounds the extraction call
//! itself. Async callers hold a cloneable [`EngineHandle`].

use std::sync::Arc;
use std::time::Duration;

use attest_core::{Embedding, ExtractorError, FeatureExtractor};

/// Clone-safe handle to the shared extractor.
#[derive(Clone)]
pub struct EngineHandle {
    extractor: Arc<dyn FeatureExtractor + Send + Sync>,
    timeout: Duration,
}

impl EngineHandle {
    /// Request an embedding for an encoded image.
    ///
    /// Returns [`ExtractorError::Timeout`] if the extraction does not
    /// finish within the configured bound; the caller may resubmit, no
    /// retry happens here.
    pub async fn extract(&self, image: Vec<u8>) -> Result<Embedding, ExtractorError> {
        let extractor = Arc::clone(&self.extractor);
        let task = tokio::task::spawn_blocking(move || extractor.extract(&image));

        let result = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(ExtractorError::Timeout),
            Ok(Err(join_err)) => Err(ExtractorError::Internal(format!(
                "extraction task failed: {join_err}"
            ))),
            Ok(Ok(result)) => result,
        };

        if let Err(err) = &result {
            tracing::warn!(error = %err, "extraction failed");
        }
        result
    }
}

/// Wrap an extractor for concurrent use, bounding every call by
/// `timeout`.
pub fn spawn_engine<E>(extractor: E, timeout: Duration) -> EngineHandle
where
    E: FeatureExtractor + Send + Sync + 'static,
{
    EngineHandle {
        extractor: Arc::new(extractor),
        timeout,
    }
}
