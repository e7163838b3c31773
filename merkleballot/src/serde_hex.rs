use ed25519_dalek::Signature;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;

pub use hex_buffer_serde::Hex;

// a single-purpose type for use in `#[serde(with)]`
pub enum EdPublicKeyHex {}

impl Hex<VerifyingKey> for EdPublicKeyHex {
    type Error = String;

    fn create_bytes(public_key: &VerifyingKey) -> Cow<[u8]> {
        public_key.as_bytes()[..].into()
    }

    fn from_bytes(bytes: &[u8]) -> Result<VerifyingKey, String> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| format!("expected 32 bytes, found {}", bytes.len()))?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| format!("{}", e))
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum EdSignatureHex {}

impl Hex<Signature> for EdSignatureHex {
    type Error = String;

    fn create_bytes(sig: &Signature) -> Cow<[u8]> {
        let bytes = sig.to_bytes().to_vec();
        Cow::from(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Signature, String> {
        Signature::from_slice(bytes).map_err(|e| format!("{}", e))
    }
}

#[derive(Serialize, Deserialize)]
struct OptionalKey(#[serde(with = "EdPublicKeyHex")] VerifyingKey);

/// `EdPublicKeyHex` for optional keys, `null` when absent
pub enum EdPublicKeyHexOption {}

impl EdPublicKeyHexOption {
    pub fn serialize<S: Serializer>(
        public_key: &Option<VerifyingKey>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        public_key.map(OptionalKey).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<VerifyingKey>, D::Error> {
        let wrapped: Option<OptionalKey> = Option::deserialize(deserializer)?;
        Ok(wrapped.map(|key| key.0))
    }
}
