use crate::*;
use indexmap::IndexMap;

/// The running state of the tally reducer: the candidate roster being counted into and the
/// log cursor of the last folded action.
#[derive(Clone, Debug)]
pub struct TallyAccumulator<H: FieldHasher = Sha256Hasher> {
    pub roster: Roster<Candidate, H>,
    pub cursor: FieldElement,
}

impl<H: FieldHasher> TallyAccumulator<H> {
    pub fn new(roster: Roster<Candidate, H>, cursor: FieldElement) -> Self {
        TallyAccumulator { roster, cursor }
    }

    pub fn root(&self) -> FieldElement {
        self.roster.root()
    }

    /// Count one action.
    ///
    /// The vote is written through the candidate's current path in the roster, not the path
    /// captured in the action: earlier folds have moved the root since the action was cast.
    pub fn fold(mut self, action: &VoteAction) -> Result<Self, Error> {
        action.witness.check_height(self.roster.height())?;

        let index = action.witness.index();
        if index != action.candidate_id as u64 {
            return Err(Error::InvalidVoteShape(format!(
                "witness leads to leaf {}, not candidate {}",
                index, action.candidate_id
            )));
        }

        let candidate = match self.roster.get(index) {
            Some(candidate) if candidate.id == action.candidate_id => *candidate,
            _ => {
                return Err(Error::InvalidVoteShape(format!(
                    "no candidate {} in roster",
                    action.candidate_id
                )))
            }
        };

        self.roster.set(index, candidate.add_vote())?;
        self.cursor = ActionLog::next_cursor(self.roster.hasher(), self.cursor, action);

        Ok(self)
    }

    /// Fold `actions` in order. Any failure discards the whole reduction.
    pub fn reduce<'a, I>(self, actions: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a VoteAction>,
    {
        actions.into_iter().try_fold(self, |acc, action| acc.fold(action))
    }
}

/// Vote counts by candidate id, in id order
pub fn totals<H: FieldHasher>(roster: &Roster<Candidate, H>) -> IndexMap<u32, u64> {
    roster
        .entries()
        .map(|(_, candidate)| (candidate.id, candidate.vote_count))
        .collect()
}
