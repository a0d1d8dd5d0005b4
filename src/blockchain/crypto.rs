use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

/// Errors that can occur during key handling
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Represents a wallet address
///
/// The ledger treats addresses as opaque strings; only the identity service
/// gives them meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key (base58 of the key bytes)
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        Address(bs58::encode(public_key.as_bytes()).into_string())
    }

    /// Converts the address to a public key
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey("Invalid public key length".to_string())
        })?;

        VerifyingKey::from_bytes(&bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

/// A freshly generated address with its private key
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyPair {
    /// The wallet's address
    pub address: String,

    /// The wallet's private key (hex encoded)
    pub private_key: String,
}

/// Decides who owns an address
///
/// The ledger never inspects keys itself; request handlers consult this
/// service before a transaction is admitted.
pub trait IdentityService: Send + Sync {
    /// Creates a new address and the private key that owns it
    fn generate_key_pair(&self) -> KeyPair;

    /// Checks that `private_key` controls `address`
    fn check_key_ownership(&self, address: &str, private_key: &str) -> bool;

    /// Checks that `address` is syntactically an address
    fn is_well_formed_address(&self, address: &str) -> bool;
}

/// Identity service backed by ed25519 keys and base58 addresses
#[derive(Debug, Clone, Default)]
pub struct Ed25519Identity;

impl Ed25519Identity {
    fn signing_key(private_key: &str) -> Result<SigningKey, CryptoError> {
        let bytes = hex::decode(private_key)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;

        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
        })?;

        Ok(SigningKey::from_bytes(&bytes))
    }
}

impl IdentityService for Ed25519Identity {
    fn generate_key_pair(&self) -> KeyPair {
        let signing_key = SigningKey::generate(&mut OsRng);
        let address = Address::from_public_key(&signing_key.verifying_key());

        KeyPair {
            address: address.0,
            private_key: hex::encode(signing_key.to_bytes()),
        }
    }

    fn check_key_ownership(&self, address: &str, private_key: &str) -> bool {
        match Self::signing_key(private_key) {
            Ok(signing_key) => Address::from_public_key(&signing_key.verifying_key()).0 == address,
            Err(_) => false,
        }
    }

    fn is_well_formed_address(&self, address: &str) -> bool {
        Address::from(address).to_public_key().is_ok()
    }
}
