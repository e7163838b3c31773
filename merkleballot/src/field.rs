use crate::*;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// An element of the BN254 scalar field.
///
/// This is the unit everything in an election is hashed, compared and counted in.
/// The canonical byte form is 32 bytes big-endian, and it serializes as a hex string.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldElement(Fr);

impl FieldElement {
    /// The zero element, also the value of an empty Merkle leaf
    pub fn zero() -> Self {
        FieldElement(Fr::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Interpret big-endian bytes as an integer and reduce it into the field
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        FieldElement(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Parse the canonical 32 byte form, rejecting values that are not reduced
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != 32 {
            return Err(Error::InvalidLength {
                expected: 32,
                found: bytes.len(),
            });
        }
        let element = Self::from_be_bytes_mod_order(bytes);
        if element.to_bytes()[..] != bytes[..] {
            return Err(Error::NonCanonicalField);
        }
        Ok(element)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let be = self.0.into_bigint().to_bytes_be();

        // Left-pad in case the backend ever hands back a short encoding
        let mut bytes = [0u8; 32];
        bytes[32 - be.len()..].copy_from_slice(&be);
        bytes
    }

    /// Access the backend representation
    pub fn inner(&self) -> &Fr {
        &self.0
    }
}

impl Default for FieldElement {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        FieldElement(Fr::from(value))
    }
}

impl From<u32> for FieldElement {
    fn from(value: u32) -> Self {
        FieldElement(Fr::from(value as u64))
    }
}

impl From<bool> for FieldElement {
    fn from(value: bool) -> Self {
        FieldElement(Fr::from(value as u64))
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        FieldElement(value)
    }
}

impl std::fmt::Display for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "FieldElement({})", self)
    }
}

impl FromStr for FieldElement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for FieldElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Canonical field encoding of a value.
///
/// The order in which elements are pushed is part of the hash domain and must never change:
/// records hash `H(encode(field_1) ++ encode(field_2) ++ ...)` in the order each impl documents.
pub trait Encode {
    fn encode(&self, out: &mut Vec<FieldElement>);

    fn to_fields(&self) -> Vec<FieldElement> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

impl Encode for FieldElement {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        out.push(*self);
    }
}

impl Encode for bool {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        out.push(FieldElement::from(*self));
    }
}

impl Encode for u64 {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        out.push(FieldElement::from(*self));
    }
}

impl Encode for u32 {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        out.push(FieldElement::from(*self));
    }
}

/// Public keys encode as two elements: bytes [0..16] then bytes [16..32]
impl Encode for VerifyingKey {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        encode_32_bytes(self.as_bytes(), out);
    }
}

/// Private keys encode their 32 byte seed the same way as public keys
impl Encode for SigningKey {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        encode_32_bytes(&self.to_bytes(), out);
    }
}

// Each half is 128 bits, well below the modulus, so nothing is lost to reduction
fn encode_32_bytes(bytes: &[u8; 32], out: &mut Vec<FieldElement>) {
    out.push(FieldElement::from_be_bytes_mod_order(&bytes[..16]));
    out.push(FieldElement::from_be_bytes_mod_order(&bytes[16..]));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_element_hex() {
        let element = FieldElement::from(0xdead_beef_u64);
        let stringed = element.to_string();
        assert_eq!(stringed.len(), 64);
        assert!(stringed.ends_with("deadbeef"));

        let from_string = FieldElement::from_str(&stringed).unwrap();
        assert_eq!(element, from_string);

        // Modulus of the BN254 scalar field is not canonical
        let modulus = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";
        assert!(matches!(
            FieldElement::from_str(modulus),
            Err(Error::NonCanonicalField)
        ));
        assert!(matches!(
            FieldElement::from_str("abcd"),
            Err(Error::InvalidLength { .. })
        ));
        assert!(FieldElement::from_str("zz").is_err());
    }

    #[test]
    fn encoding_order() {
        let (secret, public) = generate_keypair();
        let fields = public.to_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields[0],
            FieldElement::from_be_bytes_mod_order(&public.as_bytes()[..16])
        );
        assert_ne!(secret.to_fields(), fields);

        assert_eq!(true.to_fields(), vec![FieldElement::from(1u64)]);
        assert_eq!(false.to_fields(), vec![FieldElement::zero()]);
        assert!(FieldElement::default().is_zero());
    }
}
