use digest::Digest;
use sha1::Sha1;

use super::Strong;

/// Streaming SHA-1 hasher producing a [`Strong`] identity.
#[derive(Clone, Debug, Default)]
pub struct StrongHasher {
    inner: Sha1,
}

impl StrongHasher {
    /// Creates a hasher with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Sha1::new() }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest.
    #[must_use]
    pub fn finalize(self) -> Strong {
        Strong::from_bytes(self.inner.finalize().into())
    }
}

/// Computes the strong identity of `data` in one shot.
#[must_use]
pub fn strong_checksum(data: &[u8]) -> Strong {
    let mut hasher = StrongHasher::new();
    hasher.update(data);
    hasher.finalize()
}
