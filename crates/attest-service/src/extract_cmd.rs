//! External-command feature extractor.
//!
//! The embedding model itself lives outside this process. The contract
//! with the external tool:
//!
//! - the encoded image is written to its stdin;
//! - on success it prints a JSON array of floats (the embedding) to
//!   stdout and exits 0;
//! - exit code 2 means "no face detected" (stderr carries the reason);
//! - any other non-zero exit is an internal extractor fault.

use std::io::Write as _;
use std::process::{Command, Stdio};

use attest_core::{Embedding, ExtractorError, FeatureExtractor};

/// Exit code the external tool uses to report "no face in this image".
const NO_FACE_EXIT_CODE: i32 = 2;

/// Runs a configured external command per extraction request.
pub struct CommandExtractor {
    program: String,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl FeatureExtractor for CommandExtractor {
    fn extract(&self, image: &[u8]) -> Result<Embedding, ExtractorError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractorError::Internal(format!("spawn {}: {e}", self.program)))?;

        // stdin is piped, so take() cannot return None here.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractorError::Internal("extractor stdin unavailable".into()))?;
        stdin
            .write_all(image)
            .map_err(|e| ExtractorError::Internal(format!("write image: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| ExtractorError::Internal(format!("wait for extractor: {e}")))?;

        if !output.status.success() {
            let reason = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return match output.status.code() {
                Some(NO_FACE_EXIT_CODE) => Err(ExtractorError::NoFaceDetected(reason)),
                _ => Err(ExtractorError::Internal(reason)),
            };
        }

        let values: Vec<f32> = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractorError::Internal(format!("bad embedding output: {e}")))?;

        Ok(Embedding {
            values,
            model_version: None,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    // Shell scripts stand in for the external model; the process
    // contract is exercised end-to-end.

    fn script(body: &str) -> CommandExtractor {
        use std::os::unix::fs::PermissionsExt as _;
        let path = std::env::temp_dir().join(format!("attest-extract-{}.sh", uuid::Uuid::new_v4()));
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        CommandExtractor::new(path.to_string_lossy().into_owned())
    }

    #[test]
    fn test_successful_extraction() {
        let ex = script("cat > /dev/null; echo '[1.0, 0.0, 0.5]'");
        let embedding = ex.extract(b"image-bytes").unwrap();
        assert_eq!(embedding.values, vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_no_face_exit_code() {
        let ex = script("cat > /dev/null; echo 'no face found' >&2; exit 2");
        let err = ex.extract(b"image-bytes").unwrap_err();
        match err {
            ExtractorError::NoFaceDetected(reason) => assert_eq!(reason, "no face found"),
            other => panic!("expected NoFaceDetected, got {other:?}"),
        }
    }

    #[test]
    fn test_internal_failure_exit_code() {
        let ex = script("cat > /dev/null; echo 'model crashed' >&2; exit 1");
        let err = ex.extract(b"image-bytes").unwrap_err();
        assert!(matches!(err, ExtractorError::Internal(_)));
    }

    #[test]
    fn test_garbage_output_is_internal() {
        let ex = script("cat > /dev/null; echo 'not json'");
        let err = ex.extract(b"image-bytes").unwrap_err();
        assert!(matches!(err, ExtractorError::Internal(_)));
    }

    #[test]
    fn test_missing_program_is_internal() {
        let ex = CommandExtractor::new("/nonexistent/attest-extract");
        let err = ex.extract(b"image-bytes").unwrap_err();
        assert!(matches!(err, ExtractorError::Internal(_)));
    }
}
