//! Feature-extraction collaborator contract.
//!
//! How pixels become an embedding is out of scope here; the extractor
//! is a black box that turns an encoded image into a fixed-dimension
//! vector and fails distinguishably for "no face" vs its own faults.

use thiserror::Error;

use crate::types::Embedding;

#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The image decoded fine but no face was found in it. User error,
    /// not a system fault.
    #[error("no face detected: {0}")]
    NoFaceDetected(String),
    /// The extractor itself failed (bad image, crashed model, broken
    /// pipe). System fault.
    #[error("extraction failed: {0}")]
    Internal(String),
    /// The extractor did not answer within the configured bound.
    #[error("extraction timed out")]
    Timeout,
}

/// Produces a fixed-dimension embedding from an encoded image.
///
/// Implementations may block for the duration of a model inference;
/// callers are expected to isolate them on worker threads. Calls may
/// arrive concurrently from several threads at once.
pub trait FeatureExtractor {
    fn extract(&self, image: &[u8]) -> Result<Embedding, ExtractorError>;
}
