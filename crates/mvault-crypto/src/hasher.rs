use mvault_types::Digest;
use sha2::{Digest as _, Sha256};

/// Domain-separated SHA-256 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation as `"<domain>:"`. The same input hashed under two domains
/// yields unrelated digests, so identities fabricated for one purpose never
/// collide with real blob digests or with another purpose's identities.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for identities of built-in models that have no backing blobs.
    pub const SYNTHETIC: Self = Self {
        domain: "synthetic",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_sha256(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest as _;

    #[test]
    fn hash_is_deterministic() {
        let a = ContentHasher::SYNTHETIC.hash(b"foundation");
        let b = ContentHasher::SYNTHETIC.hash(b"foundation");
        assert_eq!(a, b);
    }

    #[test]
    fn matches_prefixed_sha256() {
        let domain = ContentHasher::SYNTHETIC.hash(b"library/foundation:latest");
        let raw: [u8; 32] = Sha256::digest(b"synthetic:library/foundation:latest").into();
        assert_eq!(domain.as_bytes(), &raw);
    }

    #[test]
    fn different_inputs_produce_different_hashes() {
        assert_ne!(
            ContentHasher::SYNTHETIC.hash(b"library/foundation:latest"),
            ContentHasher::SYNTHETIC.hash(b"library/foundation:v2")
        );
    }

    #[test]
    fn known_sha256_vector() {
        let digest = Digest::from_sha256(Sha256::digest(b"abc").into());
        assert_eq!(
            digest.hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
