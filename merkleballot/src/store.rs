use crate::*;
use ed25519_dalek::VerifyingKey;
use std::collections::BTreeMap;

/// A record that can occupy a slot of a roster tree
pub trait Leaf: Clone {
    fn leaf_hash<H: FieldHasher>(&self, hasher: &H) -> FieldElement;
}

/// An off-chain roster store.
///
/// The election only ever holds the root of a roster; the store holds the records and hands
/// out the witnesses callers need. Updates must come with a custodian-signed root for the
/// next version, and are only applied once that root verifies.
pub trait RosterStore<T: Leaf> {
    /// Get the record at a leaf index
    fn get(&self, index: u64) -> Option<&T>;

    fn root(&self) -> FieldElement;

    fn height(&self) -> usize;

    fn version(&self) -> u64;

    fn witness(&self, index: u64) -> Result<MerkleWitness, Error>;

    /// Apply `diff` if `signed` commits to the root it produces at the next version.
    /// Returns the new root.
    fn propose_update(
        &mut self,
        diff: &[(u64, T)],
        signed: &Signed<RootCommitment>,
        custodian: &VerifyingKey,
    ) -> Result<FieldElement, Error>;
}

/// A simple roster that keeps its records in memory next to their tree
#[derive(Clone, Debug)]
pub struct Roster<T: Leaf, H: FieldHasher = Sha256Hasher> {
    tree: MerkleTree<H>,
    entries: BTreeMap<u64, T>,
    version: u64,

    /// The election roster this store mirrors. Signed updates are only accepted once bound.
    binding: Option<(ElectionId, RosterKind)>,
}

impl<T: Leaf> Roster<T, Sha256Hasher> {
    pub fn new(height: usize) -> Result<Self, Error> {
        Self::with_hasher(height, Sha256Hasher)
    }

    /// Build a roster with `entries` at indexes 0, 1, 2, ...
    pub fn from_entries<I>(height: usize, entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
    {
        Self::from_entries_with_hasher(height, Sha256Hasher, entries)
    }
}

impl<T: Leaf, H: FieldHasher> Roster<T, H> {
    pub fn with_hasher(height: usize, hasher: H) -> Result<Self, Error> {
        Ok(Roster {
            tree: MerkleTree::with_hasher(height, hasher)?,
            entries: BTreeMap::new(),
            version: 0,
            binding: None,
        })
    }

    pub fn from_entries_with_hasher<I>(height: usize, hasher: H, entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
    {
        let mut roster = Self::with_hasher(height, hasher)?;
        for (index, entry) in entries.into_iter().enumerate() {
            roster.set(index as u64, entry)?;
        }
        Ok(roster)
    }

    /// Write a record directly, bypassing custodian authorization.
    ///
    /// Used to build rosters before their root is committed and to mirror transitions the
    /// election has already accepted.
    pub fn set(&mut self, index: u64, entry: T) -> Result<FieldElement, Error> {
        let root = self
            .tree
            .set_leaf(index, entry.leaf_hash(self.tree.hasher()))?;
        self.entries.insert(index, entry);
        Ok(root)
    }

    /// Tie the roster to one roster of one election
    pub fn bind(&mut self, election_id: ElectionId, roster: RosterKind) {
        self.binding = Some((election_id, roster));
    }

    pub fn binding(&self) -> Option<(ElectionId, RosterKind)> {
        self.binding
    }

    pub fn tree(&self) -> &MerkleTree<H> {
        &self.tree
    }

    pub fn hasher(&self) -> &H {
        self.tree.hasher()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (u64, &T)> {
        self.entries.iter().map(|(index, entry)| (*index, entry))
    }

    /// First record matching `predicate`, with its index
    pub fn find<P>(&self, predicate: P) -> Option<(u64, &T)>
    where
        P: Fn(&T) -> bool,
    {
        self.entries().find(|(_, entry)| predicate(*entry))
    }

    /// Produce the leaf updates for `diff`, each witness taken against the root left by the
    /// previous update, along with the root after all of them.
    ///
    /// This is what a custodian signs over; the roster itself is not modified.
    pub fn prepare_update(&self, diff: &[(u64, T)]) -> Result<(Vec<LeafUpdate>, FieldElement), Error> {
        let mut working = self.tree.clone();
        let mut updates = Vec::with_capacity(diff.len());

        for (index, entry) in diff {
            let old_leaf = working.get_leaf(*index)?;
            let witness = working.witness(*index)?;
            let new_leaf = entry.leaf_hash(working.hasher());
            working.set_leaf(*index, new_leaf)?;

            updates.push(LeafUpdate {
                old_leaf,
                new_leaf,
                witness,
            });
        }

        Ok((updates, working.root()))
    }
}

impl<T: Leaf, H: FieldHasher> RosterStore<T> for Roster<T, H> {
    fn get(&self, index: u64) -> Option<&T> {
        self.entries.get(&index)
    }

    fn root(&self) -> FieldElement {
        self.tree.root()
    }

    fn height(&self) -> usize {
        self.tree.height()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn witness(&self, index: u64) -> Result<MerkleWitness, Error> {
        self.tree.witness(index)
    }

    fn propose_update(
        &mut self,
        diff: &[(u64, T)],
        signed: &Signed<RootCommitment>,
        custodian: &VerifyingKey,
    ) -> Result<FieldElement, Error> {
        let (election_id, roster) = self.binding.ok_or(Error::RootCommitmentMismatch)?;
        let (updates, _) = self.prepare_update(diff)?;

        let current = RootCommitment {
            election_id,
            roster,
            version: self.version,
            root: self.root(),
        };
        let accepted = verify_root_update(
            self.hasher(),
            custodian,
            self.height(),
            &current,
            &updates,
            signed,
        )?;

        // Verified against a clone above, so applying cannot fail halfway
        let mut next = self.clone();
        for (index, entry) in diff {
            next.set(*index, entry.clone())?;
        }
        next.version = accepted.version;
        *self = next;

        tracing::debug!(
            roster = %accepted.roster,
            version = accepted.version,
            root = %accepted.root,
            "roster update accepted"
        );

        Ok(accepted.root)
    }
}
