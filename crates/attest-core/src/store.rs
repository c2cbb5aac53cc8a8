//! The persistence collaborator contract.
//!
//! Implemented by storage backends (e.g. `attest-store-sqlite`). The
//! core never assumes in-memory exclusivity over identities or
//! attendance events; uniqueness constraints (identity id, email) are
//! the backend's job.

use std::future::Future;

use uuid::Uuid;

use crate::types::{AttendanceEvent, Identity};

/// Abstraction over the durable store for identities and attendance.
///
/// Attendance writes are append-only; events are never updated or
/// deleted through this interface. All methods return `Send` futures
/// so the trait is usable from a multi-threaded async runtime.
pub trait Store: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieve an identity by id. Returns `None` if not found.
    fn get_identity(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

    /// Retrieve an identity by its contact email. Returns `None` if
    /// not found.
    fn find_identity_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

    /// Persist a newly-enrolled identity. Fails if the id or email is
    /// already taken.
    fn put_identity(
        &self,
        identity: Identity,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

    /// List all enrolled identities, newest enrollment first.
    fn list_identities(
        &self,
    ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

    /// Append one immutable attendance event.
    fn append_attendance(
        &self,
        event: AttendanceEvent,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

    /// All attendance events, timestamp descending (newest first).
    fn list_attendance(
        &self,
    ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + '_;
}
