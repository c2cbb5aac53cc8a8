//! End-to-end flows over an in-memory SQLite store and a stub
//! extractor: enroll, verify, login, attendance.

use std::time::Duration;

use uuid::Uuid;

use attest_core::{
    Embedding, EventKind, ExtractorError, FeatureExtractor, NewIdentity, SessionError,
};
use attest_service::{spawn_engine, Config, Service, ServiceError};
use attest_store_sqlite::SqliteStore;

/// Decodes the "image" bytes as a JSON float array — tests choose the
/// live embedding per call. Anything else counts as a faceless image.
struct StubExtractor;

impl FeatureExtractor for StubExtractor {
    fn extract(&self, image: &[u8]) -> Result<Embedding, ExtractorError> {
        let values: Vec<f32> = serde_json::from_slice(image)
            .map_err(|_| ExtractorError::NoFaceDetected("no face in frame".into()))?;
        Ok(Embedding { values, model_version: Some("stub".into()) })
    }
}

fn test_config() -> Config {
    Config {
        db_path: ":memory:".into(),
        similarity_threshold: 0.6,
        session_lifetime_secs: 86_400,
        session_secret: b"integration-test-secret".to_vec(),
        extractor_cmd: "unused".into(),
        extract_timeout_secs: 5,
        samples_per_enroll: 3,
    }
}

async fn service() -> Service<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let engine = spawn_engine(StubExtractor, Duration::from_secs(5));
    Service::new(store, engine, &test_config())
}

fn image(values: &[f32]) -> Vec<u8> {
    serde_json::to_vec(values).unwrap()
}

fn alice() -> NewIdentity {
    NewIdentity {
        name: "Alice Example".into(),
        department: "Engineering".into(),
        email: "alice@example.com".into(),
    }
}

/// Three toy 2-D captures average to roughly [0.993, 0.067].
fn alice_samples() -> Vec<Vec<u8>> {
    vec![
        image(&[1.0, 0.0]),
        image(&[1.0, 0.0]),
        image(&[0.98, 0.2]),
    ]
}

#[tokio::test]
async fn enroll_then_verify_matches() {
    let svc = service().await;
    let identity = svc.enroll(alice(), &alice_samples()).await.unwrap();

    let reference = identity.embedding.as_ref().unwrap();
    assert!((reference.values[0] - 0.9933).abs() < 1e-3);
    assert!((reference.values[1] - 0.0667).abs() < 1e-3);

    let result = svc.verify(identity.id, &image(&[1.0, 0.0])).await.unwrap();
    assert!(result.recognized);
    assert_eq!(result.identity_id, Some(identity.id));
    assert!(result.confidence > 0.99);
}

#[tokio::test]
async fn verify_orthogonal_face_is_no_match() {
    let svc = service().await;
    let identity = svc.enroll(alice(), &alice_samples()).await.unwrap();

    // Orthogonal to the stored reference: similarity ~ 0.
    let result = svc
        .verify(identity.id, &image(&[-0.0667, 0.9933]))
        .await
        .unwrap();
    assert!(!result.recognized);
    assert_eq!(result.identity_id, None);
    assert!(result.confidence.abs() < 0.01);
}

#[tokio::test]
async fn verify_unknown_identity_is_not_found() {
    let svc = service().await;
    let err = svc.verify(Uuid::new_v4(), &image(&[1.0, 0.0])).await.unwrap_err();
    // Unknown person must never surface as a NO_MATCH result.
    assert!(matches!(err, ServiceError::IdentityNotFound));
}

#[tokio::test]
async fn verify_faceless_image_fails_with_extraction_error() {
    let svc = service().await;
    let identity = svc.enroll(alice(), &alice_samples()).await.unwrap();

    let err = svc.verify(identity.id, b"not an image").await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Extraction(ExtractorError::NoFaceDetected(_))
    ));
}

#[tokio::test]
async fn enroll_with_no_samples_fails() {
    let svc = service().await;
    let err = svc.enroll(alice(), &[]).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Embedding(attest_core::EmbeddingError::EmptySampleSet)
    ));
}

#[tokio::test]
async fn duplicate_enrollment_is_store_conflict() {
    let svc = service().await;
    svc.enroll(alice(), &alice_samples()).await.unwrap();
    let err = svc.enroll(alice(), &alice_samples()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
}

#[tokio::test]
async fn login_issues_token_only_on_match() {
    let svc = service().await;
    svc.enroll(alice(), &alice_samples()).await.unwrap();

    // Wrong face: no session comes back.
    let err = svc
        .login("alice@example.com", &image(&[-0.0667, 0.9933]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotRecognized { .. }));

    // Right face: token round-trips through authenticate.
    let login = svc
        .login("alice@example.com", &image(&[1.0, 0.0]))
        .await
        .unwrap();
    assert!(login.confidence > 0.99);
    let id = svc.authenticate(Some(login.token.as_str())).unwrap();
    assert_eq!(id, login.identity.id);
}

#[tokio::test]
async fn login_unknown_email_is_not_found() {
    let svc = service().await;
    let err = svc
        .login("nobody@example.com", &image(&[1.0, 0.0]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IdentityNotFound));
}

#[tokio::test]
async fn attendance_requires_a_token() {
    let svc = service().await;
    let err = svc
        .mark_attendance(None, EventKind::CheckIn, 0.9)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Session(SessionError::TokenMissing)
    ));

    let err = svc
        .mark_attendance(Some("garbage-token"), EventKind::CheckIn, 0.9)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Session(SessionError::TokenMalformed)
    ));
}

#[tokio::test]
async fn attendance_rejects_out_of_range_confidence() {
    let svc = service().await;
    svc.enroll(alice(), &alice_samples()).await.unwrap();
    let login = svc
        .login("alice@example.com", &image(&[1.0, 0.0]))
        .await
        .unwrap();

    for bad in [1.5, -0.2, f32::NAN] {
        let err = svc
            .mark_attendance(Some(login.token.as_str()), EventKind::CheckIn, bad)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServiceError::InvalidConfidence(_)),
            "confidence {bad}: {err:?}"
        );
    }
}

#[tokio::test]
async fn check_in_and_out_are_listed_newest_first() {
    let svc = service().await;
    svc.enroll(alice(), &alice_samples()).await.unwrap();
    let login = svc
        .login("alice@example.com", &image(&[1.0, 0.0]))
        .await
        .unwrap();
    let token = Some(login.token.as_str());

    let check_in = svc
        .mark_attendance(token, EventKind::CheckIn, login.confidence)
        .await
        .unwrap();
    // Same identity, consecutive events; alternation is not enforced.
    let second_in = svc
        .mark_attendance(token, EventKind::CheckIn, login.confidence)
        .await
        .unwrap();
    let check_out = svc
        .mark_attendance(token, EventKind::CheckOut, login.confidence)
        .await
        .unwrap();

    assert_eq!(check_in.identity_name, "Alice Example");

    let events = svc.attendance().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].id, check_out.id);
    assert_eq!(events[1].id, second_in.id);
    assert_eq!(events[2].id, check_in.id);
}
