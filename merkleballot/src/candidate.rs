use crate::*;

/// A candidate, one leaf of the candidate tree at index `id`.
///
/// Field order for hashing: `id`, `vote_count`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: u32,
    pub vote_count: u64,
}

impl Candidate {
    /// A candidate with no votes, as committed at election start
    pub fn new(id: u32) -> Self {
        Candidate { id, vote_count: 0 }
    }

    /// Only the tally reducer calls this
    pub fn add_vote(&self) -> Candidate {
        Candidate {
            id: self.id,
            vote_count: self.vote_count + 1,
        }
    }
}

impl Encode for Candidate {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        self.id.encode(out);
        self.vote_count.encode(out);
    }
}

impl Leaf for Candidate {
    fn leaf_hash<H: FieldHasher>(&self, hasher: &H) -> FieldElement {
        hasher.hash(&self.to_fields())
    }
}
