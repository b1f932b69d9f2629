//! Keys, addresses and signatures.

use crate::error::ChainError;
use crate::Hash;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};

/// Thread-safe, lazily initialized secp256k1 context, shared by all key
/// operations.
static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// A wallet address: the hex encoding of a compressed secp256k1 public key.
/// Verification recovers the key directly from the address, so no separate
/// key registry is needed.
pub type Address = String;

pub const ADDRESS_HEX_SIZE: usize = PUBLIC_KEY_SIZE * 2;

#[derive(Debug, Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random keypair from the OS random number generator.
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::new(&mut OsRng))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::KeyMismatch(format!(
                    "secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::KeyMismatch(format!("invalid secret key bytes: {e}"))
            }
        })?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(hex_str: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ChainError::KeyMismatch(format!("invalid secret key hex: {e}")))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// The address this key signs for.
    pub fn address(&self) -> Address {
        hex::encode(self.public_key.serialize())
    }

    /// Signs a 32-byte digest, returning compact signature bytes.
    pub fn sign_digest(&self, digest: &Hash) -> Result<[u8; COMPACT_SIGNATURE_SIZE], ChainError> {
        let message = Message::from_digest_slice(digest)
            .map_err(|e| ChainError::KeyMismatch(format!("digest not signable: {e}")))?;
        let signature = SECP.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Verifies a hex-encoded compact signature over `digest` against `address`.
/// Malformed addresses or signatures verify as false rather than erroring:
/// verification is a query, not an action.
pub fn verify_signature(address: &str, digest: &Hash, signature_hex: &str) -> bool {
    let Ok(pubkey_bytes) = hex::decode(address) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_slice(&pubkey_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_compact(&sig_bytes) else {
        return false;
    };
    let Ok(message) = Message::from_digest_slice(digest) else {
        return false;
    };
    SECP.verify_ecdsa(&message, &signature, &public_key).is_ok()
}
