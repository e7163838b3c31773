use crate::*;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use rand::Rng;

pub fn generate_keypair() -> (SigningKey, VerifyingKey) {
    let mut csprng = rand::rngs::OsRng {};
    let secret = SigningKey::generate(&mut csprng);
    let public = secret.verifying_key();
    (secret, public)
}

/// A random field element, for passwords and nullifier secrets
pub fn random_field_element() -> FieldElement {
    let mut csprng = rand::rngs::OsRng {};

    // 31 bytes always fits below the modulus, so every value is equally likely
    let bytes: [u8; 31] = csprng.gen();
    FieldElement::from_be_bytes_mod_order(&bytes)
}
