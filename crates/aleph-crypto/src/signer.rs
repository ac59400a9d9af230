use aleph_types::PublisherIdentity;

/// Ed25519 publisher signing key (private).
pub struct PublisherKey(ed25519_dalek::SigningKey);

/// Ed25519 publisher verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct PublisherPublicKey(ed25519_dalek::VerifyingKey);

impl PublisherKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a hex-encoded 32-byte secret.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s.trim()).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    /// Hex-encoded secret, suitable for a key file.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublisherPublicKey {
        PublisherPublicKey(self.0.verifying_key())
    }
}

impl PublisherIdentity for PublisherKey {
    fn public_id(&self) -> String {
        self.public_key().to_hex()
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        use ed25519_dalek::Signer;
        self.0.sign(message).to_bytes().to_vec()
    }
}

impl PublisherPublicKey {
    /// Parse a public id produced by [`PublisherKey::public_id`].
    pub fn from_public_id(id: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(id).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&arr)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Verify a raw 64-byte signature on a message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        let sig = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| SignatureError::InvalidSignature)?;
        self.0
            .verify(message, &sig)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Hex-encoded public key (the publisher's public id).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

impl std::fmt::Debug for PublisherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublisherKey(<redacted>)")
    }
}

impl std::fmt::Debug for PublisherPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublisherPublicKey({})", self.to_hex())
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
}
