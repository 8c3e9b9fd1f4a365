//! Hashing primitives for ModelVault.
//!
//! Provides the hash-while-decode digest computer used to fingerprint manifest
//! files and a domain-separated SHA-256 content hasher used to derive stable
//! identities without touching disk.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod computer;
pub mod hasher;

pub use computer::{digest_bytes, DecodeError, Decoded, DigestComputer, HashingReader};
pub use hasher::ContentHasher;
