//! attest-core — Identity verification from face embeddings.
//!
//! Pure domain logic: cosine similarity between embeddings, enrollment
//! aggregation, signed session tokens, and the collaborator contracts
//! (feature extraction, persistence) that the service layer wires up.

pub mod aggregate;
pub mod extractor;
pub mod session;
pub mod store;
pub mod types;

pub use aggregate::{Aggregator, MeanAggregator};
pub use extractor::{ExtractorError, FeatureExtractor};
pub use session::{SessionConfig, SessionError, SessionManager};
pub use store::Store;
pub use types::{
    AttendanceEvent, Embedding, EmbeddingError, EventKind, Identity, MatchPolicy, NewIdentity,
    VerificationResult,
};
