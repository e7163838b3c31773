use crate::*;
use std::collections::BTreeMap;

/// Largest supported tree height (leaf count 2^32)
pub const MAX_TREE_HEIGHT: usize = 32;

/// One step of a Merkle path: the sibling at that level and which side it sits on
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathNode {
    pub sibling: FieldElement,
    pub sibling_is_left: bool,
}

/// A Merkle inclusion path, ordered from the leaf up to the root.
///
/// The witness records the shape of the tree around one leaf, not the root. The same
/// witness can therefore recompute the root for the old leaf value (to authenticate it)
/// and for the new one (to commit an update).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MerkleWitness {
    path: Vec<PathNode>,
}

impl MerkleWitness {
    pub fn new(path: Vec<PathNode>) -> Self {
        MerkleWitness { path }
    }

    pub fn height(&self) -> usize {
        self.path.len()
    }

    pub fn path(&self) -> &[PathNode] {
        &self.path
    }

    /// The leaf index this path leads to.
    ///
    /// A sibling on the left means our node is the right child, which is a 1 bit at that level.
    pub fn index(&self) -> u64 {
        self.path
            .iter()
            .enumerate()
            .fold(0u64, |index, (level, node)| {
                if node.sibling_is_left {
                    index | (1u64 << level)
                } else {
                    index
                }
            })
    }

    /// Fold the path bottom-up from `leaf`
    pub fn compute_root<H: FieldHasher>(&self, hasher: &H, leaf: FieldElement) -> FieldElement {
        self.path.iter().fold(leaf, |acc, node| {
            if node.sibling_is_left {
                hasher.hash_pair(node.sibling, acc)
            } else {
                hasher.hash_pair(acc, node.sibling)
            }
        })
    }

    pub fn verify<H: FieldHasher>(
        &self,
        hasher: &H,
        leaf: FieldElement,
        root: FieldElement,
    ) -> bool {
        self.compute_root(hasher, leaf) == root
    }

    pub fn check_height(&self, height: usize) -> Result<(), Error> {
        if self.height() != height {
            return Err(Error::height(height, self.height()));
        }
        Ok(())
    }
}

/// Roots of empty subtrees, indexed by level. `zeros[0]` is the empty leaf.
fn zero_hashes<H: FieldHasher>(hasher: &H, height: usize) -> Vec<FieldElement> {
    let mut zeros = Vec::with_capacity(height + 1);
    zeros.push(FieldElement::zero());
    for level in 0..height {
        let below = zeros[level];
        zeros.push(hasher.hash_pair(below, below));
    }
    zeros
}

/// The well-known root of a tree of the given height with every leaf empty
pub fn empty_root<H: FieldHasher>(hasher: &H, height: usize) -> FieldElement {
    zero_hashes(hasher, height)[height]
}

fn check_tree_height(height: usize) -> Result<(), Error> {
    if height == 0 || height > MAX_TREE_HEIGHT {
        return Err(Error::InvalidParameters(format!(
            "tree height must be between 1 and {}, got {}",
            MAX_TREE_HEIGHT, height
        )));
    }
    Ok(())
}

/// A fixed-height binary Merkle tree over field elements.
///
/// Leaves are pre-allocated (`0..2^height`) and start empty; they are only ever
/// overwritten, never inserted or removed. Only non-empty nodes are stored.
#[derive(Clone, Debug)]
pub struct MerkleTree<H: FieldHasher = Sha256Hasher> {
    height: usize,
    hasher: H,
    zeros: Vec<FieldElement>,

    // (level, index) -> node, level 0 being the leaves
    nodes: BTreeMap<(usize, u64), FieldElement>,
}

impl MerkleTree<Sha256Hasher> {
    pub fn new(height: usize) -> Result<Self, Error> {
        Self::with_hasher(height, Sha256Hasher)
    }
}

impl<H: FieldHasher> MerkleTree<H> {
    pub fn with_hasher(height: usize, hasher: H) -> Result<Self, Error> {
        check_tree_height(height)?;
        let zeros = zero_hashes(&hasher, height);
        Ok(MerkleTree {
            height,
            hasher,
            zeros,
            nodes: BTreeMap::new(),
        })
    }

    /// Build a tree with `leaves` placed at indexes 0, 1, 2, ...
    pub fn from_leaves<I>(height: usize, hasher: H, leaves: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = FieldElement>,
    {
        let mut tree = Self::with_hasher(height, hasher)?;
        for (index, leaf) in leaves.into_iter().enumerate() {
            tree.set_leaf(index as u64, leaf)?;
        }
        Ok(tree)
    }

    /// The smallest height whose leaf count can hold `count` leaves
    pub fn height_for_capacity(count: u64) -> usize {
        let mut height = 1;
        while height < 64 && (1u64 << height) < count {
            height += 1;
        }
        height
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.height
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn root(&self) -> FieldElement {
        self.node(self.height, 0)
    }

    fn node(&self, level: usize, index: u64) -> FieldElement {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zeros[level])
    }

    fn check_index(&self, index: u64) -> Result<(), Error> {
        if index >= self.capacity() {
            return Err(Error::index(index, self.height));
        }
        Ok(())
    }

    pub fn get_leaf(&self, index: u64) -> Result<FieldElement, Error> {
        self.check_index(index)?;
        Ok(self.node(0, index))
    }

    /// Overwrite a leaf and rehash its path. Returns the new root.
    pub fn set_leaf(&mut self, index: u64, value: FieldElement) -> Result<FieldElement, Error> {
        self.check_index(index)?;

        let mut index = index;
        let mut value = value;
        for level in 0..=self.height {
            if value == self.zeros[level] {
                self.nodes.remove(&(level, index));
            } else {
                self.nodes.insert((level, index), value);
            }

            if level == self.height {
                break;
            }

            let (left, right) = if index & 1 == 0 {
                (value, self.node(level, index + 1))
            } else {
                (self.node(level, index - 1), value)
            };
            value = self.hasher.hash_pair(left, right);
            index >>= 1;
        }

        Ok(self.root())
    }

    pub fn witness(&self, index: u64) -> Result<MerkleWitness, Error> {
        self.check_index(index)?;

        let mut index = index;
        let mut path = Vec::with_capacity(self.height);
        for level in 0..self.height {
            let sibling_is_left = index & 1 == 1;
            let sibling = self.node(level, index ^ 1);
            path.push(PathNode {
                sibling,
                sibling_is_left,
            });
            index >>= 1;
        }

        Ok(MerkleWitness::new(path))
    }

    /// Check `witness` authenticates `leaf` under `root`.
    ///
    /// Fails with a shape error if the witness was not built for a tree of this height.
    pub fn verify(
        &self,
        witness: &MerkleWitness,
        leaf: FieldElement,
        root: FieldElement,
    ) -> Result<bool, Error> {
        witness.check_height(self.height)?;
        Ok(witness.verify(&self.hasher, leaf, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_tree() {
        let tree = MerkleTree::new(4).unwrap();
        assert_eq!(tree.capacity(), 16);
        assert_eq!(tree.root(), empty_root(&Sha256Hasher, 4));
        assert_ne!(tree.root(), empty_root(&Sha256Hasher, 5));
        assert_eq!(tree.get_leaf(15).unwrap(), FieldElement::zero());

        assert!(MerkleTree::new(0).is_err());
        assert!(MerkleTree::new(MAX_TREE_HEIGHT + 1).is_err());
        assert!(MerkleTree::new(MAX_TREE_HEIGHT).is_ok());
    }

    #[test]
    fn set_leaf_and_back() {
        let mut tree = MerkleTree::new(3).unwrap();
        let empty = tree.root();

        let root = tree.set_leaf(5, FieldElement::from(42u64)).unwrap();
        assert_ne!(root, empty);
        assert_eq!(tree.get_leaf(5).unwrap(), FieldElement::from(42u64));

        // Writing the empty value back restores the empty root
        let root = tree.set_leaf(5, FieldElement::zero()).unwrap();
        assert_eq!(root, empty);
        assert!(tree.nodes.is_empty());
    }

    #[test]
    fn root_matches_manual_hashing() {
        let hasher = Sha256Hasher;
        let leaves: Vec<FieldElement> = (1..=4u64).map(FieldElement::from).collect();
        let tree = MerkleTree::from_leaves(2, hasher, leaves.clone()).unwrap();

        let left = hasher.hash_pair(leaves[0], leaves[1]);
        let right = hasher.hash_pair(leaves[2], leaves[3]);
        assert_eq!(tree.root(), hasher.hash_pair(left, right));
    }

    #[test]
    fn witness_shape() {
        let mut tree = MerkleTree::new(4).unwrap();
        tree.set_leaf(6, FieldElement::from(7u64)).unwrap();
        let witness = tree.witness(6).unwrap();

        assert_eq!(witness.height(), 4);
        assert_eq!(witness.index(), 6);

        // Out of bounds index
        assert!(matches!(
            tree.witness(16),
            Err(Error::ShapeMismatch(Shape::Index { index: 16, height: 4 }))
        ));
        assert!(tree.set_leaf(16, FieldElement::zero()).is_err());

        // Witness from a tree of another height
        let other = MerkleTree::new(5).unwrap();
        let short = other.witness(6).unwrap();
        assert!(matches!(
            tree.verify(&short, FieldElement::from(7u64), tree.root()),
            Err(Error::ShapeMismatch(Shape::Height {
                expected: 4,
                found: 5
            }))
        ));
    }

    #[test]
    fn stale_witness_fails() {
        let mut tree = MerkleTree::new(3).unwrap();
        tree.set_leaf(0, FieldElement::from(1u64)).unwrap();
        let witness = tree.witness(0).unwrap();

        tree.set_leaf(1, FieldElement::from(2u64)).unwrap();
        assert!(!tree
            .verify(&witness, FieldElement::from(1u64), tree.root())
            .unwrap());
        assert!(tree
            .verify(&tree.witness(0).unwrap(), FieldElement::from(1u64), tree.root())
            .unwrap());
    }

    #[test]
    fn witness_updates_root() {
        let mut tree = MerkleTree::new(8).unwrap();
        tree.set_leaf(3, FieldElement::from(10u64)).unwrap();
        tree.set_leaf(200, FieldElement::from(20u64)).unwrap();

        let witness = tree.witness(3).unwrap();
        let predicted = witness.compute_root(tree.hasher(), FieldElement::from(11u64));
        let actual = tree.set_leaf(3, FieldElement::from(11u64)).unwrap();
        assert_eq!(predicted, actual);
    }

    #[test]
    fn capacity_heights() {
        assert_eq!(MerkleTree::<Sha256Hasher>::height_for_capacity(0), 1);
        assert_eq!(MerkleTree::<Sha256Hasher>::height_for_capacity(2), 1);
        assert_eq!(MerkleTree::<Sha256Hasher>::height_for_capacity(3), 2);
        assert_eq!(MerkleTree::<Sha256Hasher>::height_for_capacity(100), 7);
        assert_eq!(MerkleTree::<Sha256Hasher>::height_for_capacity(1_000_000), 20);
    }

    proptest! {
        #[test]
        fn witness_round_trip(height in 1usize..16, seed in any::<u64>(), value in any::<u64>(), other in any::<u64>()) {
            let mut tree = MerkleTree::new(height).unwrap();
            let index = seed % tree.capacity();

            // Some unrelated leaf so the path is not all zeros
            tree.set_leaf(other % tree.capacity(), FieldElement::from(other)).unwrap();

            let value = FieldElement::from(value);
            tree.set_leaf(index, value).unwrap();
            let witness = tree.witness(index).unwrap();

            prop_assert!(tree.verify(&witness, value, tree.root()).unwrap());
            prop_assert_eq!(witness.index(), index);
        }
    }
}
