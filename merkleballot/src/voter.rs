use crate::*;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;

/// Password every voter is enrolled with, until they salt their leaf with `set_password`
pub const DEFAULT_PASSWORD: u64 = 0;

/// An eligible voter, one leaf of the voter tree.
///
/// Field order for hashing: `public_key`, `is_voted`, `password`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Voter {
    #[serde(with = "EdPublicKeyHex")]
    pub public_key: VerifyingKey,
    pub password: FieldElement,
    pub is_voted: bool,
}

impl Voter {
    /// Enroll a voter with the default password
    pub fn new(public_key: VerifyingKey) -> Self {
        Self::with_password(public_key, FieldElement::from(DEFAULT_PASSWORD))
    }

    pub fn with_password(public_key: VerifyingKey, password: FieldElement) -> Self {
        Voter {
            public_key,
            password,
            is_voted: false,
        }
    }

    /// The unvoted leaf a holder of `private_key` claims to own
    pub fn from_private_key(private_key: &SigningKey, password: FieldElement) -> Self {
        Self::with_password(private_key.verifying_key(), password)
    }

    /// The same voter, with its ballot spent
    pub fn vote(&self) -> Voter {
        Voter {
            is_voted: true,
            ..self.clone()
        }
    }

    pub fn set_password(&self, password: FieldElement) -> Voter {
        Voter {
            password,
            ..self.clone()
        }
    }
}

impl Encode for Voter {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        self.public_key.encode(out);
        self.is_voted.encode(out);
        self.password.encode(out);
    }
}

impl Leaf for Voter {
    fn leaf_hash<H: FieldHasher>(&self, hasher: &H) -> FieldElement {
        hasher.hash(&self.to_fields())
    }
}

/// An anonymous voting credential, one leaf of the commitment tree.
///
/// `identity_commitment = H(private_key, nullifier_secret)` hides who registered, and
/// `public_nullifier = H(election_id, nullifier_secret)` is unique per credential and election.
/// Field order for hashing: `identity_commitment`, `public_nullifier`, `has_voted`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityCommitment {
    pub identity_commitment: FieldElement,
    pub public_nullifier: FieldElement,
    pub has_voted: bool,
}

impl IdentityCommitment {
    pub fn derive<H: FieldHasher>(
        hasher: &H,
        election_id: ElectionId,
        private_key: &SigningKey,
        nullifier_secret: FieldElement,
    ) -> Self {
        let mut preimage = private_key.to_fields();
        nullifier_secret.encode(&mut preimage);
        let identity_commitment = hasher.hash(&preimage);

        let mut preimage = election_id.to_fields();
        nullifier_secret.encode(&mut preimage);
        let public_nullifier = hasher.hash(&preimage);

        IdentityCommitment {
            identity_commitment,
            public_nullifier,
            has_voted: false,
        }
    }

    pub fn vote(&self) -> IdentityCommitment {
        IdentityCommitment {
            has_voted: true,
            ..*self
        }
    }
}

impl Encode for IdentityCommitment {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        self.identity_commitment.encode(out);
        self.public_nullifier.encode(out);
        self.has_voted.encode(out);
    }
}

impl Leaf for IdentityCommitment {
    fn leaf_hash<H: FieldHasher>(&self, hasher: &H) -> FieldElement {
        hasher.hash(&self.to_fields())
    }
}
