//! Hashing primitives for Tessel.
//!
//! Provides the content hasher that produces `"<algo>:<hex>"` addresses and
//! the canonical JSON encoding used wherever content is hashed, so that
//! semantically identical values always hash identically.
//!
//! Hashing delegates to the `sha2` and `blake3` crates.

pub mod canonical;
pub mod hasher;

pub use canonical::{canonicalize, to_canonical_string, to_canonical_vec, CanonicalError};
pub use hasher::ContentHasher;
