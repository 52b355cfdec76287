//! Content-addressable release registry for upkeep.
//!
//! The registry records, for every registered project release and bundle,
//! each shipped file's path and fingerprint. Lookups by path answer "which
//! released versions of this file exist", and comparing fingerprints answers
//! "is this file one of them, byte for byte".
//!
//! # Storage Backends
//!
//! All backends implement the [`ReleaseRegistry`] trait:
//!
//! - [`InMemoryRegistry`] -- lock-guarded vectors for tests and embedding
//! - [`SqliteRegistry`] -- the persistent `FILERELEASE`/`BUNDLE`/`PROJECT` store
//!
//! # Design Rules
//!
//! 1. Rows are append-only. There is no update or delete.
//! 2. No uniqueness beyond the path index: registering a release twice
//!    duplicates its rows.
//! 3. Path comparison ignores ASCII case.
//! 4. [`ReleaseRegistry::register_files`] is one atomic window; larger
//!    registrations go through [`RegistrationBatch`].

pub mod batch;
pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use batch::{RegistrationBatch, RegistrationProgress, DEFAULT_BATCH_SIZE};
pub use error::{RegistryError, RegistryResult};
pub use memory::InMemoryRegistry;
pub use record::{BundleId, NewFileRelease, ProjectId};
pub use sqlite::SqliteRegistry;
pub use traits::ReleaseRegistry;
