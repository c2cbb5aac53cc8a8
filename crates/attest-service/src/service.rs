//! The service façade: enrollment, verification, login, attendance.
//!
//! Every operation is a single logical request — no cross-request state
//! lives here. Durable state belongs to the [`Store`], and the only
//! slow call (extraction) goes through the timeout-bounded engine.

use thiserror::Error;
use uuid::Uuid;

use attest_core::{
    Aggregator, AttendanceEvent, Embedding, EmbeddingError, EventKind, ExtractorError, Identity,
    MatchPolicy, MeanAggregator, NewIdentity, SessionConfig, SessionError, SessionManager, Store,
    VerificationResult,
};

use crate::config::Config;
use crate::engine::EngineHandle;

#[derive(Error, Debug)]
pub enum ServiceError<E: std::error::Error> {
    /// The claimed identity does not exist. Deliberately distinct from
    /// a NO_MATCH verification: "unknown person" is not "wrong face".
    #[error("identity not found")]
    IdentityNotFound,
    #[error("identity has no reference embedding")]
    NoReferenceEmbedding,
    /// Verification ran and rejected the live face.
    #[error("face not recognized (confidence {confidence:.2})")]
    NotRecognized { confidence: f32 },
    /// A recorded confidence must be a verification score in [0, 1].
    #[error("confidence {0} outside [0.0, 1.0]")]
    InvalidConfidence(f32),
    #[error("feature extraction failed: {0}")]
    Extraction(#[from] ExtractorError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("store error: {0}")]
    Store(#[source] E),
}

/// A successful login: a bearer token plus what it was granted on.
#[derive(Debug)]
pub struct LoginSession {
    pub token: String,
    pub identity: Identity,
    pub confidence: f32,
}

pub struct Service<S> {
    store: S,
    engine: EngineHandle,
    policy: MatchPolicy,
    sessions: SessionManager,
    aggregator: Box<dyn Aggregator + Send + Sync>,
    samples_per_enroll: usize,
}

impl<S: Store> Service<S> {
    pub fn new(store: S, engine: EngineHandle, config: &Config) -> Self {
        Self {
            store,
            engine,
            policy: MatchPolicy::new(config.similarity_threshold),
            sessions: SessionManager::new(SessionConfig::new(
                config.session_secret.clone(),
                chrono::Duration::seconds(config.session_lifetime_secs),
            )),
            aggregator: Box::new(MeanAggregator),
            samples_per_enroll: config.samples_per_enroll,
        }
    }

    /// Swap the enrollment aggregation strategy. Callers of
    /// [`enroll`](Self::enroll) are unaffected.
    pub fn with_aggregator(mut self, aggregator: Box<dyn Aggregator + Send + Sync>) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Enroll a new identity from one or more sample images.
    ///
    /// Extracts an embedding per image, aggregates them into a single
    /// reference, and persists the identity once. Any extraction
    /// failure aborts the whole enrollment; nothing partial is stored.
    pub async fn enroll(
        &self,
        details: NewIdentity,
        images: &[Vec<u8>],
    ) -> Result<Identity, ServiceError<S::Error>> {
        if images.len() < self.samples_per_enroll {
            tracing::warn!(
                provided = images.len(),
                expected = self.samples_per_enroll,
                "enrolling with fewer samples than configured"
            );
        }

        let mut samples = Vec::with_capacity(images.len());
        for image in images {
            samples.push(self.engine.extract(image.clone()).await?);
        }
        let reference = self.aggregator.aggregate(&samples)?;

        let identity = Identity::new(details, reference);
        tracing::info!(
            id = %identity.id,
            email = %identity.email,
            samples = samples.len(),
            dim = identity.embedding.as_ref().map(Embedding::dim),
            "identity enrolled"
        );

        self.store
            .put_identity(identity.clone())
            .await
            .map_err(ServiceError::Store)?;

        Ok(identity)
    }

    /// Verify a live image against a claimed identity.
    ///
    /// Read-only: writes neither identity nor session state. Callers
    /// decide what to do with the decision.
    pub async fn verify(
        &self,
        claimed_id: Uuid,
        image: &[u8],
    ) -> Result<VerificationResult, ServiceError<S::Error>> {
        let identity = self
            .store
            .get_identity(claimed_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::IdentityNotFound)?;

        self.verify_against(&identity, image).await
    }

    /// Resolve an identity by contact email and verify the live image
    /// against it; issue a session token only on a positive match.
    pub async fn login(
        &self,
        email: &str,
        image: &[u8],
    ) -> Result<LoginSession, ServiceError<S::Error>> {
        let identity = self
            .store
            .find_identity_by_email(email)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::IdentityNotFound)?;

        let result = self.verify_against(&identity, image).await?;
        if !result.recognized {
            tracing::info!(
                email = %email,
                confidence = result.confidence,
                "login rejected: face did not match"
            );
            return Err(ServiceError::NotRecognized {
                confidence: result.confidence,
            });
        }

        let token = self.sessions.issue(identity.id);
        tracing::info!(id = %identity.id, "login verified, session issued");

        Ok(LoginSession {
            token,
            identity,
            confidence: result.confidence,
        })
    }

    /// Resolve a presented bearer token to the identity it is bound to.
    /// Each failure kind is logged distinctly; callers map all of them
    /// to an unauthenticated response.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Uuid, ServiceError<S::Error>> {
        let token = token.ok_or(SessionError::TokenMissing)?;
        self.sessions.validate(token).map_err(|err| {
            tracing::warn!(kind = %err, "session rejected");
            err.into()
        })
    }

    /// Record a check-in/check-out for the holder of `token`.
    ///
    /// The caller is expected to have verified the face in this same
    /// logical request (`confidence` comes from that decision); no
    /// re-verification happens here. Any event kind may follow any
    /// other — alternation is not enforced.
    pub async fn mark_attendance(
        &self,
        token: Option<&str>,
        kind: EventKind,
        confidence: f32,
    ) -> Result<AttendanceEvent, ServiceError<S::Error>> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ServiceError::InvalidConfidence(confidence));
        }

        let identity_id = self.authenticate(token)?;

        let identity = self
            .store
            .get_identity(identity_id)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::IdentityNotFound)?;

        let event = AttendanceEvent::new(identity.id, identity.name, kind, confidence);
        if let Err(err) = self.store.append_attendance(event.clone()).await {
            // A dropped attendance mark must be a visible failure.
            tracing::error!(id = %identity.id, error = %err, "attendance write failed");
            return Err(ServiceError::Store(err));
        }

        tracing::info!(
            id = %event.identity_id,
            kind = event.kind.as_str(),
            confidence = event.confidence,
            "attendance recorded"
        );
        Ok(event)
    }

    /// All attendance events, newest first.
    pub async fn attendance(&self) -> Result<Vec<AttendanceEvent>, ServiceError<S::Error>> {
        self.store.list_attendance().await.map_err(ServiceError::Store)
    }

    /// All enrolled identities.
    pub async fn identities(&self) -> Result<Vec<Identity>, ServiceError<S::Error>> {
        self.store.list_identities().await.map_err(ServiceError::Store)
    }

    async fn verify_against(
        &self,
        identity: &Identity,
        image: &[u8],
    ) -> Result<VerificationResult, ServiceError<S::Error>> {
        let reference = identity
            .embedding
            .as_ref()
            .ok_or(ServiceError::NoReferenceEmbedding)?;

        let live = self.engine.extract(image.to_vec()).await?;
        let confidence = live.similarity(reference)?;
        let recognized = self.policy.is_match(confidence);

        tracing::debug!(
            id = %identity.id,
            confidence,
            threshold = self.policy.threshold,
            recognized,
            "similarity computed"
        );

        Ok(VerificationResult {
            recognized,
            identity_id: recognized.then_some(identity.id),
            confidence,
        })
    }
}
