use crate::*;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Serialize;
use std::ops::Deref;

/// Which of an election's rosters a root belongs to
#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RosterKind {
    Voters = 1,
    Candidates = 2,
    Commitments = 3,
}

impl std::fmt::Display for RosterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            RosterKind::Voters => "Voters",
            RosterKind::Candidates => "Candidates",
            RosterKind::Commitments => "Commitments",
        };
        write!(f, "{}", name)
    }
}

/// A versioned roster root, as signed by the election custodian
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootCommitment {
    pub election_id: ElectionId,
    pub roster: RosterKind,
    pub version: u64,
    pub root: FieldElement,
}

impl Signable for RootCommitment {}

/// Anything the custodian can sign. Signatures cover the CBOR encoding of the payload.
pub trait Signable: Serialize {
    fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(&self)?)
    }
}

/// A signed payload
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Signed<T: Signable> {
    pub payload: T,

    #[serde(with = "EdSignatureHex")]
    pub sig: Signature,
}

impl<T: Signable> Signed<T> {
    pub fn sign(secret: &SigningKey, payload: T) -> Result<Self, Error> {
        let serialized = payload.as_bytes()?;
        let sig = secret.sign(&serialized);

        Ok(Signed { payload, sig })
    }

    /// Verify the signature was made by `public`
    pub fn verify_signature(&self, public: &VerifyingKey) -> Result<(), Error> {
        let serialized = self.payload.as_bytes()?;
        Ok(public.verify_strict(&serialized, &self.sig)?)
    }

    /// Get the inner unsigned payload
    pub fn inner(&self) -> &T {
        &self.payload
    }
}

impl<T: Signable> AsRef<T> for Signed<T> {
    fn as_ref(&self) -> &T {
        &self.payload
    }
}

impl<T: Signable> Deref for Signed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.payload
    }
}

/// One leaf of a roster update.
///
/// `witness` is the path of the leaf in the tree as it stands after the previous update of
/// the same batch, so a batch can be checked by folding a running root.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LeafUpdate {
    pub old_leaf: FieldElement,
    pub new_leaf: FieldElement,
    pub witness: MerkleWitness,
}

impl LeafUpdate {
    pub fn index(&self) -> u64 {
        self.witness.index()
    }
}

/// Check a custodian-signed roster update against the current committed root.
///
/// Every update must authenticate its old leaf against the running root, and the root left
/// after the last one must be exactly the signed root. Returns the accepted commitment.
pub fn verify_root_update<H: FieldHasher>(
    hasher: &H,
    custodian: &VerifyingKey,
    height: usize,
    current: &RootCommitment,
    updates: &[LeafUpdate],
    signed: &Signed<RootCommitment>,
) -> Result<RootCommitment, Error> {
    signed.verify_signature(custodian)?;

    if signed.election_id != current.election_id || signed.roster != current.roster {
        return Err(Error::RootCommitmentMismatch);
    }

    let expected = current.version + 1;
    if signed.version != expected {
        return Err(Error::StaleRootVersion {
            expected,
            found: signed.version,
        });
    }

    let mut running = current.root;
    for update in updates {
        update.witness.check_height(height)?;
        if !update.witness.verify(hasher, update.old_leaf, running) {
            return Err(Error::RootMismatch);
        }
        running = update.witness.compute_root(hasher, update.new_leaf);
    }

    if running != signed.root {
        return Err(Error::RootMismatch);
    }

    Ok(*signed.inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commitment(election_id: ElectionId, version: u64, root: FieldElement) -> RootCommitment {
        RootCommitment {
            election_id,
            roster: RosterKind::Candidates,
            version,
            root,
        }
    }

    #[test]
    fn roster_kind() {
        assert_eq!(RosterKind::Voters as u8, 1);
        assert_eq!(RosterKind::Commitments.to_string(), "Commitments");
        assert_eq!(
            serde_json::to_string(&RosterKind::Candidates).unwrap(),
            "\"candidates\""
        );
    }

    #[test]
    fn sign_and_verify() {
        let (secret, public) = generate_keypair();
        let (_, other) = generate_keypair();
        let signed = Signed::sign(
            &secret,
            commitment(ElectionId::new_random(), 1, FieldElement::from(5u64)),
        )
        .unwrap();

        signed.verify_signature(&public).unwrap();
        assert!(matches!(
            signed.verify_signature(&other),
            Err(Error::Signature(_))
        ));

        let json = serde_json::to_string(&signed).unwrap();
        let back: Signed<RootCommitment> = serde_json::from_str(&json).unwrap();
        back.verify_signature(&public).unwrap();

        // Altering the payload breaks the signature
        let mut forged = back.clone();
        forged.payload.version = 2;
        assert!(forged.verify_signature(&public).is_err());
    }

    #[test]
    fn batch_update() {
        let hasher = Sha256Hasher;
        let election_id = ElectionId::new_random();
        let (secret, custodian) = generate_keypair();

        let roster = Roster::from_entries(3, (0..3).map(Candidate::new)).unwrap();
        let current = commitment(election_id, 4, roster.root());

        let diff = vec![(3u64, Candidate::new(3)), (4u64, Candidate::new(4))];
        let (updates, new_root) = roster.prepare_update(&diff).unwrap();
        assert_eq!(updates[1].index(), 4);

        let signed = Signed::sign(&secret, commitment(election_id, 5, new_root)).unwrap();
        let accepted =
            verify_root_update(&hasher, &custodian, 3, &current, &updates, &signed).unwrap();
        assert_eq!(accepted.root, new_root);
        assert_eq!(accepted.version, 5);

        // Order matters: each witness is taken after the previous update
        let reversed: Vec<LeafUpdate> = updates.iter().rev().cloned().collect();
        assert!(matches!(
            verify_root_update(&hasher, &custodian, 3, &current, &reversed, &signed),
            Err(Error::RootMismatch)
        ));

        // Forged leaf
        let mut forged = updates.clone();
        forged[0].old_leaf = FieldElement::from(1u64);
        assert!(matches!(
            verify_root_update(&hasher, &custodian, 3, &current, &forged, &signed),
            Err(Error::RootMismatch)
        ));

        // Wrong height
        assert!(matches!(
            verify_root_update(&hasher, &custodian, 4, &current, &updates, &signed),
            Err(Error::ShapeMismatch(_))
        ));

        // Skipped version
        let skipped = Signed::sign(&secret, commitment(election_id, 6, new_root)).unwrap();
        assert!(matches!(
            verify_root_update(&hasher, &custodian, 3, &current, &updates, &skipped),
            Err(Error::StaleRootVersion {
                expected: 5,
                found: 6
            })
        ));

        // Another election
        let elsewhere =
            Signed::sign(&secret, commitment(ElectionId::new_random(), 5, new_root)).unwrap();
        assert!(matches!(
            verify_root_update(&hasher, &custodian, 3, &current, &updates, &elsewhere),
            Err(Error::RootCommitmentMismatch)
        ));
    }
}
