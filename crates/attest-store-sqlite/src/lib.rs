//! attest-store-sqlite — SQLite implementation of the attest
//! persistence contract ([`attest_core::Store`]).

mod error;
mod schema;
mod store;


pub use error::{Error, Result};
pub use store::SqliteStore;
