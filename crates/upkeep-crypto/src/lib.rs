//! Content fingerprinting for upkeep.
//!
//! Provides domain-separated BLAKE3 hashing of file contents. A fingerprint is
//! the only equality test the registry and the analyzer use to decide that a
//! file is byte-identical to a released one.
//!
//! All crypto operations wrap established libraries; there is no custom
//! cryptography here.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError};
