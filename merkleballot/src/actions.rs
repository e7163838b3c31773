use crate::*;
use indexmap::IndexMap;

/// Append-only, content-addressed log of dispatched vote actions.
///
/// Each entry is keyed by the cursor reached after appending it:
/// `cursor' = H(cursor, H(action))`, starting from `initial_cursor`. The tip therefore commits
/// to the whole history, and any cursor is a verifiable resume point.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ActionLog {
    initial: FieldElement,
    entries: IndexMap<FieldElement, VoteAction>,
}

impl ActionLog {
    pub fn new<H: FieldHasher>(hasher: &H) -> Self {
        ActionLog {
            initial: Self::initial_cursor(hasher),
            entries: IndexMap::new(),
        }
    }

    /// Cursor of the empty log
    pub fn initial_cursor<H: FieldHasher>(hasher: &H) -> FieldElement {
        hasher.hash(&[FieldElement::zero()])
    }

    pub fn next_cursor<H: FieldHasher>(
        hasher: &H,
        cursor: FieldElement,
        action: &VoteAction,
    ) -> FieldElement {
        hasher.hash_pair(cursor, action.hash(hasher))
    }

    pub fn initial(&self) -> FieldElement {
        self.initial
    }

    /// Cursor after the last appended action
    pub fn tip(&self) -> FieldElement {
        self.entries
            .last()
            .map(|(cursor, _)| *cursor)
            .unwrap_or(self.initial)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an action and return the new tip
    pub fn append<H: FieldHasher>(&mut self, hasher: &H, action: VoteAction) -> FieldElement {
        let cursor = Self::next_cursor(hasher, self.tip(), &action);
        self.entries.insert(cursor, action);
        cursor
    }

    pub fn contains_cursor(&self, cursor: FieldElement) -> bool {
        cursor == self.initial || self.entries.contains_key(&cursor)
    }

    /// All actions appended after `cursor`, in log order
    pub fn since(&self, cursor: FieldElement) -> Result<Vec<&VoteAction>, Error> {
        let start = if cursor == self.initial {
            0
        } else {
            self.entries
                .get_index_of(&cursor)
                .map(|position| position + 1)
                .ok_or(Error::UnknownCursor)?
        };

        Ok(self.entries.values().skip(start).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldElement, &VoteAction)> {
        self.entries.iter()
    }

    /// Recompute the cursor chain and check every key matches.
    ///
    /// A log restored from storage must pass this before it is trusted.
    pub fn verify<H: FieldHasher>(&self, hasher: &H) -> bool {
        if self.initial != Self::initial_cursor(hasher) {
            return false;
        }

        let mut cursor = self.initial;
        for (key, action) in self.entries.iter() {
            cursor = Self::next_cursor(hasher, cursor, action);
            if cursor != *key {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(count: u32) -> Vec<VoteAction> {
        let tree = MerkleTree::new(3).unwrap();
        (0..count)
            .map(|i| VoteAction::new(i % 8, tree.witness((i % 8) as u64).unwrap()))
            .collect()
    }

    #[test]
    fn append_and_resume() {
        let hasher = Sha256Hasher;
        let mut log = ActionLog::new(&hasher);
        assert!(log.is_empty());
        assert_eq!(log.tip(), ActionLog::initial_cursor(&hasher));
        assert!(log.since(log.initial()).unwrap().is_empty());

        let actions = actions(5);
        let mut cursors = Vec::new();
        for action in actions.iter() {
            cursors.push(log.append(&hasher, action.clone()));
        }
        assert_eq!(log.len(), 5);
        assert_eq!(log.tip(), cursors[4]);

        let all = log.since(log.initial()).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], &actions[0]);

        let rest = log.since(cursors[1]).unwrap();
        assert_eq!(rest.len(), 3);
        assert_eq!(rest[0], &actions[2]);

        assert!(log.since(log.tip()).unwrap().is_empty());
        assert!(matches!(
            log.since(FieldElement::from(7u64)),
            Err(Error::UnknownCursor)
        ));
        assert!(log.contains_cursor(cursors[3]));
        assert!(log.verify(&hasher));
    }

    #[test]
    fn cursor_depends_on_order() {
        let hasher = Sha256Hasher;
        let actions = actions(2);

        let mut forward = ActionLog::new(&hasher);
        forward.append(&hasher, actions[0].clone());
        forward.append(&hasher, actions[1].clone());

        let mut backward = ActionLog::new(&hasher);
        backward.append(&hasher, actions[1].clone());
        backward.append(&hasher, actions[0].clone());

        assert_ne!(forward.tip(), backward.tip());
    }

    #[test]
    fn tampering_is_detected() {
        let hasher = Sha256Hasher;
        let mut log = ActionLog::new(&hasher);
        for action in actions(3) {
            log.append(&hasher, action);
        }

        let json = serde_json::to_string(&log).unwrap();
        let restored: ActionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, log);
        assert!(restored.verify(&hasher));

        // Swap the candidate of the second action
        let mut tampered = log.clone();
        if let Some((_, action)) = tampered.entries.get_index_mut(1) {
            action.candidate_id = 7;
        }
        assert!(!tampered.verify(&hasher));
    }
}
