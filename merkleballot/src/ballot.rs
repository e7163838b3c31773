use crate::*;

/// One dispatched vote: the chosen candidate plus the candidate-tree path captured when
/// the vote was cast.
///
/// Actions carry no voter data. Field order for hashing: `candidate_id`, then for each path
/// node from the leaf up, `sibling` and `sibling_is_left`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VoteAction {
    pub candidate_id: u32,
    pub witness: MerkleWitness,
}

impl VoteAction {
    pub fn new(candidate_id: u32, witness: MerkleWitness) -> Self {
        VoteAction {
            candidate_id,
            witness,
        }
    }

    /// Content address of the action in the log
    pub fn hash<H: FieldHasher>(&self, hasher: &H) -> FieldElement {
        hasher.hash(&self.to_fields())
    }
}

impl Encode for VoteAction {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        self.candidate_id.encode(out);
        for node in self.witness.path() {
            node.sibling.encode(out);
            node.sibling_is_left.encode(out);
        }
    }
}

/// A one-hot ballot: one entry per candidate, each 0 or 1.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ballot {
    pub votes: Vec<u32>,
}

impl Ballot {
    pub fn new(votes: Vec<u32>) -> Self {
        Ballot { votes }
    }

    /// A ballot with a single mark
    pub fn for_candidate(candidate_count: u32, candidate_id: u32) -> Self {
        let votes = (0..candidate_count)
            .map(|i| if i == candidate_id { 1 } else { 0 })
            .collect();
        Ballot { votes }
    }

    /// Validate the ballot against the election and return the marked candidate ids.
    ///
    /// The ballot must have exactly `candidate_count` entries and the sum of its entries must
    /// be within the election's per-ballot bounds. Entries are 0 or 1 unless the election
    /// allows several votes for one candidate, in which case a candidate's id is repeated
    /// once per vote.
    pub fn selections(&self, params: &ElectionParams) -> Result<Vec<u32>, Error> {
        if self.votes.len() != params.candidate_count as usize {
            return Err(Error::InvalidVoteShape(format!(
                "ballot has {} entries, election has {} candidates",
                self.votes.len(),
                params.candidate_count
            )));
        }

        if !params.is_multiple_allowed {
            if let Some(bad) = self.votes.iter().find(|v| **v > 1) {
                return Err(Error::InvalidVoteShape(format!(
                    "ballot entries must be 0 or 1, found {}",
                    bad
                )));
            }
        }

        let marks = self
            .votes
            .iter()
            .try_fold(0u32, |sum, v| sum.checked_add(*v))
            .ok_or_else(|| Error::InvalidVoteShape("ballot vote count overflows".into()))?;
        if marks < params.min_votes_per_ballot || marks > params.max_votes_per_ballot {
            return Err(Error::InvalidVoteShape(format!(
                "ballot casts {} votes, allowed between {} and {}",
                marks, params.min_votes_per_ballot, params.max_votes_per_ballot
            )));
        }

        let selections = self
            .votes
            .iter()
            .enumerate()
            .flat_map(|(i, v)| std::iter::repeat(i as u32).take(*v as usize))
            .collect();

        Ok(selections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(candidate_count: u32, min: u32, max: u32) -> ElectionParams {
        let mut params = ElectionParams::new(0, 10, candidate_count, 3);
        params.min_votes_per_ballot = min;
        params.max_votes_per_ballot = max;
        params
    }

    #[test]
    fn ballot_selections() {
        let single = params(4, 1, 1);
        assert_eq!(
            Ballot::for_candidate(4, 2).selections(&single).unwrap(),
            vec![2]
        );

        // Wrong length
        assert!(matches!(
            Ballot::new(vec![1, 0, 0]).selections(&single),
            Err(Error::InvalidVoteShape(_))
        ));

        // Not one-hot
        assert!(Ballot::new(vec![0, 2, 0, 0]).selections(&single).is_err());

        // Too many and too few marks
        assert!(Ballot::new(vec![1, 1, 0, 0]).selections(&single).is_err());
        assert!(Ballot::new(vec![0, 0, 0, 0]).selections(&single).is_err());

        let approval = params(4, 0, 3);
        assert_eq!(
            Ballot::new(vec![1, 0, 1, 1]).selections(&approval).unwrap(),
            vec![0, 2, 3]
        );
        assert!(Ballot::new(vec![0, 0, 0, 0])
            .selections(&approval)
            .unwrap()
            .is_empty());
        assert!(Ballot::new(vec![1, 1, 1, 1]).selections(&approval).is_err());

        // Repeated votes are refused unless the election allows them
        assert!(matches!(
            Ballot::new(vec![2, 0, 1, 0]).selections(&approval),
            Err(Error::InvalidVoteShape(_))
        ));
    }

    #[test]
    fn multiple_votes_per_candidate() {
        let mut cumulative = params(3, 1, 4);
        cumulative.is_multiple_allowed = true;

        assert_eq!(
            Ballot::new(vec![2, 0, 1]).selections(&cumulative).unwrap(),
            vec![0, 0, 2]
        );
        assert_eq!(
            Ballot::new(vec![0, 4, 0]).selections(&cumulative).unwrap(),
            vec![1, 1, 1, 1]
        );

        // The sum of entries is bounded, not the number of marked candidates
        assert!(Ballot::new(vec![3, 0, 2]).selections(&cumulative).is_err());
        assert!(Ballot::new(vec![0, 0, 0]).selections(&cumulative).is_err());
        assert!(Ballot::new(vec![u32::MAX, 1, 0])
            .selections(&cumulative)
            .is_err());
    }

    #[test]
    fn action_hash_binds_witness() {
        let hasher = Sha256Hasher;
        let mut tree = MerkleTree::new(3).unwrap();
        tree.set_leaf(1, Candidate::new(1).leaf_hash(&hasher))
            .unwrap();

        let action = VoteAction::new(1, tree.witness(1).unwrap());
        let other_path = VoteAction::new(1, tree.witness(3).unwrap());
        let other_candidate = VoteAction::new(2, tree.witness(1).unwrap());

        assert_eq!(action.to_fields().len(), 1 + 2 * 3);
        assert_ne!(action.hash(&hasher), other_path.hash(&hasher));
        assert_ne!(action.hash(&hasher), other_candidate.hash(&hasher));
    }
}
