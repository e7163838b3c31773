use crate::*;
use digest::Digest;
use sha2::Sha256;

/// A collision-resistant hash over sequences of field elements.
///
/// The host supplies this primitive. Every leaf, node, commitment and action-log cursor
/// in an election is derived through the same hasher, so an election must keep using the
/// hasher it was started with.
pub trait FieldHasher: Clone {
    fn hash(&self, inputs: &[FieldElement]) -> FieldElement;

    /// Hash of an internal Merkle node
    fn hash_pair(&self, left: FieldElement, right: FieldElement) -> FieldElement {
        self.hash(&[left, right])
    }
}

/// SHA-256 over the canonical encoding of the inputs, reduced into the field.
///
/// Input layout: domain tag, input count as u64 big-endian, then each element's 32 bytes.
#[derive(Default, Clone, Copy, Debug)]
pub struct Sha256Hasher;

const SHA256_DOMAIN: &[u8] = b"merkleballot.field-hash.v1";

impl FieldHasher for Sha256Hasher {
    fn hash(&self, inputs: &[FieldElement]) -> FieldElement {
        let mut hasher = Sha256::new();
        hasher.update(SHA256_DOMAIN);
        hasher.update((inputs.len() as u64).to_be_bytes());
        for input in inputs {
            hasher.update(input.to_bytes());
        }
        FieldElement::from_be_bytes_mod_order(&hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hasher() {
        let hasher = Sha256Hasher;
        let a = FieldElement::from(1u64);
        let b = FieldElement::from(2u64);

        assert_eq!(hasher.hash(&[a, b]), hasher.hash_pair(a, b));
        assert_ne!(hasher.hash_pair(a, b), hasher.hash_pair(b, a));

        // Length is part of the domain, so a trailing zero changes the digest
        assert_ne!(hasher.hash(&[a]), hasher.hash(&[a, FieldElement::zero()]));
        assert_ne!(hasher.hash(&[]), FieldElement::zero());
    }
}
