use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("degenerate embedding: zero norm has no direction")]
    DegenerateVector,
    #[error("cannot aggregate an empty sample set")]
    EmptySampleSet,
}

/// Face embedding vector (dimension fixed by the extractor, e.g. 128
/// for Facenet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "facenet").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Compute cosine similarity between two embeddings:
    /// `1 - cosine_distance`, i.e. `dot / (||a|| * ||b||)`.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. Fails if the
    /// vectors disagree in dimension, or if either has zero norm (its
    /// direction is undefined).
    pub fn similarity(&self, other: &Embedding) -> Result<f32, EmbeddingError> {
        if self.values.len() != other.values.len() {
            return Err(EmbeddingError::DimensionMismatch {
                left: self.values.len(),
                right: other.values.len(),
            });
        }

        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom == 0.0 {
            return Err(EmbeddingError::DegenerateVector);
        }

        Ok(dot / denom)
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }
}

/// Threshold policy for turning a similarity score into a decision.
///
/// The threshold is a tunable, passed in at construction from
/// configuration — never a constant baked into call sites.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    pub threshold: f32,
}

impl MatchPolicy {
    /// Default confidence threshold for a positive match.
    pub const DEFAULT_THRESHOLD: f32 = 0.6;

    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// A score strictly above the threshold is a match.
    pub fn is_match(&self, score: f32) -> bool {
        score > self.threshold
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

/// An enrolled person with their stored reference embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub email: String,
    /// Reference embedding derived at enrollment. `None` only for
    /// legacy/incomplete records; verification rejects those.
    pub embedding: Option<Embedding>,
    pub enrolled_at: DateTime<Utc>,
}

impl Identity {
    /// Build a freshly-enrolled identity with a generated id.
    pub fn new(details: NewIdentity, embedding: Embedding) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: details.name,
            department: details.department,
            email: details.email,
            embedding: Some(embedding),
            enrolled_at: Utc::now(),
        }
    }
}

/// Enrollment request details, before an id or embedding exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIdentity {
    pub name: String,
    pub department: String,
    pub email: String,
}

/// Outcome of verifying a live embedding against a claimed identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub recognized: bool,
    /// Set only when recognized.
    pub identity_id: Option<Uuid>,
    /// Cosine similarity of live vs reference, in [-1, 1].
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CheckIn => "check-in",
            EventKind::CheckOut => "check-out",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check-in" => Ok(EventKind::CheckIn),
            "check-out" => Ok(EventKind::CheckOut),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// Immutable attendance fact. Never updated after creation; ordering
/// for one identity is by timestamp, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub identity_id: Uuid,
    /// Snapshot of the identity name at write time. Intentionally
    /// non-authoritative: a later rename does not rewrite history.
    pub identity_name: String,
    pub kind: EventKind,
    /// Verification confidence carried over from the matching decision.
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl AttendanceEvent {
    pub fn new(identity_id: Uuid, identity_name: String, kind: EventKind, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            identity_name,
            kind,
            confidence,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: Vec<f32>) -> Embedding {
        Embedding { values, model_version: None }
    }

    #[test]
    fn test_similarity_identical() {
        let a = emb(vec![0.3, -1.2, 0.5]);
        assert!((a.similarity(&a).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = emb(vec![1.0, 2.0, 3.0]);
        let b = emb(vec![-0.5, 0.25, 4.0]);
        assert_eq!(a.similarity(&b).unwrap(), b.similarity(&a).unwrap());
    }

    #[test]
    fn test_similarity_orthogonal() {
        let a = emb(vec![1.0, 0.0]);
        let b = emb(vec![0.0, 1.0]);
        assert!(a.similarity(&b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_similarity_opposite() {
        let a = emb(vec![1.0, 0.0]);
        let b = emb(vec![-1.0, 0.0]);
        assert!((a.similarity(&b).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_dimension_mismatch() {
        let a = emb(vec![1.0, 0.0, 0.0]);
        let b = emb(vec![1.0, 0.0]);
        assert_eq!(
            a.similarity(&b),
            Err(EmbeddingError::DimensionMismatch { left: 3, right: 2 })
        );
    }

    #[test]
    fn test_similarity_zero_vector() {
        let a = emb(vec![0.0, 0.0]);
        let b = emb(vec![1.0, 0.0]);
        assert_eq!(a.similarity(&b), Err(EmbeddingError::DegenerateVector));
        assert_eq!(b.similarity(&a), Err(EmbeddingError::DegenerateVector));
    }

    #[test]
    fn test_match_policy_strictly_above() {
        let policy = MatchPolicy::new(0.6);
        assert!(!policy.is_match(0.6));
        assert!(policy.is_match(0.6001));
        assert!(!policy.is_match(0.2));
    }

    #[test]
    fn test_event_kind_round_trip() {
        for kind in [EventKind::CheckIn, EventKind::CheckOut] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("checkin".parse::<EventKind>().is_err());
    }
}
