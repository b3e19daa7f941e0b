use std::{fmt, str::FromStr};

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Serialize, Serializer};
use thiserror::Error;

const PRIVATE_KEY_DER_PREFIX: &str = "302e020100300506032b657004220420";
const PUBLIC_KEY_DER_PREFIX: &str = "302a300506032b6570032100";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key is not valid hex")]
    InvalidHex,
    #[error("Expected a 32 byte ED25519 key, optionally DER encoded, got {0} bytes")]
    InvalidLength(usize),
    #[error("Bytes are not a valid ED25519 public key")]
    InvalidPublicKey,
}

/// ED25519 private key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn generate_ed25519() -> Self {
        Self(SigningKey::from_bytes(&rand::random::<[u8; 32]>()))
    }

    /// Accepts raw (64 hex chars) or DER encoded (96 hex chars) keys,
    /// with or without a `0x` prefix.
    pub fn from_str_ed25519(s: &str) -> Result<Self, KeyError> {
        let bytes = decode_key_hex(s, PRIVATE_KEY_DER_PREFIX)?;
        Ok(Self(SigningKey::from_bytes(&bytes)))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }

    pub fn to_string_der(&self) -> String {
        format!("{PRIVATE_KEY_DER_PREFIX}{}", hex::encode(&self.0.to_bytes()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey")
            .field(&self.public_key())
            .finish()
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_ed25519(s)
    }
}

/// ED25519 public key, kept as its 32 byte encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    pub fn from_str_ed25519(s: &str) -> Result<Self, KeyError> {
        Self::from_bytes(decode_key_hex(s, PUBLIC_KEY_DER_PREFIX)?)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        VerifyingKey::from_bytes(&self.0)
            .and_then(|key| key.verify_strict(message, &Signature::from_bytes(signature)))
            .is_ok()
    }

    pub fn to_string_raw(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PUBLIC_KEY_DER_PREFIX}{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_string_raw())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_raw())
    }
}

/// A list of keys, of which `threshold` must sign. Without a threshold every
/// key must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyList {
    keys: Vec<Key>,
    threshold: Option<u32>,
}

impl KeyList {
    pub fn new(keys: impl IntoIterator<Item = impl Into<Key>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            threshold: None,
        }
    }

    pub fn with_threshold(keys: impl IntoIterator<Item = impl Into<Key>>, threshold: u32) -> Self {
        Self {
            threshold: Some(threshold),
            ..Self::new(keys)
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn threshold(&self) -> Option<u32> {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Single(PublicKey),
    List(KeyList),
}

impl Key {
    /// Whether signatures from `signers` are enough to satisfy this key.
    pub fn is_satisfied_by(&self, signers: &[PublicKey]) -> bool {
        match self {
            Key::Single(key) => signers.contains(key),
            Key::List(list) => {
                let signed = list
                    .keys
                    .iter()
                    .filter(|key| key.is_satisfied_by(signers))
                    .count();
                let required = list
                    .threshold
                    .map_or(list.keys.len(), |threshold| threshold as usize);
                // an empty list can never be signed for
                !list.keys.is_empty() && signed >= required
            }
        }
    }
}

impl From<PublicKey> for Key {
    fn from(key: PublicKey) -> Self {
        Key::Single(key)
    }
}

impl From<&PrivateKey> for Key {
    fn from(key: &PrivateKey) -> Self {
        Key::Single(key.public_key())
    }
}

impl From<KeyList> for Key {
    fn from(list: KeyList) -> Self {
        Key::List(list)
    }
}

fn decode_key_hex(s: &str, der_prefix: &str) -> Result<[u8; 32], KeyError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let raw = if s.len() == der_prefix.len() + 64 && s.to_ascii_lowercase().starts_with(der_prefix)
    {
        &s[der_prefix.len()..]
    } else {
        s
    };
    let bytes = hex::decode(raw).map_err(|_| KeyError::InvalidHex)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| KeyError::InvalidLength(len))
}
