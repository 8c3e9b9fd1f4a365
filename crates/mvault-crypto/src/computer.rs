//! Hash-while-decode digest computation.
//!
//! A manifest's digest is the SHA-256 of the exact bytes stored in its file,
//! not of a canonical re-encoding. Two files that decode to the same manifest
//! but differ in whitespace or key order therefore have different digests.
//! [`HashingReader`] observes the byte stream as the decoder pulls it, so the
//! file is traversed once.

use std::io::{self, Read};

use serde::de::DeserializeOwned;
use sha2::{Digest as _, Sha256};

/// Pass-through reader that feeds every byte it yields into a SHA-256 state.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    bytes_read: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Number of bytes that have passed through so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read the source to exhaustion, hashing what remains.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }

    /// Consume the reader and return the hex digest of every byte read.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

/// A decoded value together with the digest of its source bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded<T> {
    pub value: T,
    /// Hex-encoded SHA-256 of the full byte stream.
    pub digest: String,
    /// Length of the byte stream.
    pub len: u64,
}

/// Errors from [`DigestComputer::decode_json`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The underlying source failed.
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// The bytes are not a well-formed value of the requested type.
    #[error("malformed content: {0}")]
    Malformed(String),
}

/// Decodes structured content while fingerprinting the raw input.
pub struct DigestComputer;

impl DigestComputer {
    /// Decode one JSON value from `reader`, hashing every byte consumed.
    ///
    /// The source is drained after decoding so the digest always covers the
    /// whole stream.
    pub fn decode_json<T, R>(reader: R) -> Result<Decoded<T>, DecodeError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        let mut hashing = HashingReader::new(reader);
        let value = serde_json::from_reader(&mut hashing).map_err(|e| {
            if e.is_io() {
                DecodeError::Io(io::Error::from(e))
            } else {
                DecodeError::Malformed(e.to_string())
            }
        })?;
        hashing.drain()?;
        let len = hashing.bytes_read();
        Ok(Decoded {
            value,
            digest: hashing.finalize_hex(),
            len,
        })
    }
}

/// Hex-encoded SHA-256 of an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
