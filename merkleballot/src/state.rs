use crate::*;
use content_inspector::ContentType;
use ed25519_dalek::VerifyingKey;

/// Lifecycle of an election. Phases only move forward.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unstarted,
    Open,
    Finished,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Phase::Unstarted => "Unstarted",
            Phase::Open => "Open",
            Phase::Finished => "Finished",
        };
        write!(f, "{}", name)
    }
}

/// Scalar parameters fixed when the election starts
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ElectionParams {
    /// Voting opens at this time (ms), inclusive
    pub start_time: u64,

    /// Voting closes at this time (ms), inclusive. Tally is possible strictly after it.
    pub end_time: u64,

    pub candidate_count: u32,
    pub voter_count: u32,

    /// Bounds on the number of marks a one-hot ballot may carry
    pub min_votes_per_ballot: u32,
    pub max_votes_per_ballot: u32,

    /// A ballot may give one candidate several votes. Only meaningful when the maximum
    /// exceeds the minimum.
    #[serde(default)]
    pub is_multiple_allowed: bool,
}

impl ElectionParams {
    /// Single-choice election parameters
    pub fn new(start_time: u64, end_time: u64, candidate_count: u32, voter_count: u32) -> Self {
        ElectionParams {
            start_time,
            end_time,
            candidate_count,
            voter_count,
            min_votes_per_ballot: 1,
            max_votes_per_ballot: 1,
            is_multiple_allowed: false,
        }
    }

    pub fn validate(&self, config: &ElectionConfig, now: u64) -> Result<(), Error> {
        if self.start_time >= self.end_time {
            return Err(Error::InvalidParameters(format!(
                "start time {} must be before end time {}",
                self.start_time, self.end_time
            )));
        }

        if self.end_time <= now {
            return Err(Error::InvalidParameters(format!(
                "end time {} has already passed",
                self.end_time
            )));
        }

        if self.candidate_count == 0 || self.candidate_count > config.max_candidate_count {
            return Err(Error::InvalidParameters(format!(
                "candidate count must be between 1 and {}, got {}",
                config.max_candidate_count, self.candidate_count
            )));
        }

        if self.voter_count == 0 || self.voter_count > config.max_voter_count {
            return Err(Error::InvalidParameters(format!(
                "voter count must be between 1 and {}, got {}",
                config.max_voter_count, self.voter_count
            )));
        }

        if self.min_votes_per_ballot > self.max_votes_per_ballot {
            return Err(Error::InvalidParameters(format!(
                "ballot bounds [{}, {}] are inverted",
                self.min_votes_per_ballot, self.max_votes_per_ballot
            )));
        }

        if self.is_multiple_allowed {
            if self.max_votes_per_ballot == self.min_votes_per_ballot {
                return Err(Error::InvalidParameters(format!(
                    "multiple votes per candidate need a range of votes per ballot, got exactly {}",
                    self.max_votes_per_ballot
                )));
            }
        } else if self.max_votes_per_ballot > self.candidate_count {
            return Err(Error::InvalidParameters(format!(
                "ballot bounds [{}, {}] do not fit {} candidates",
                self.min_votes_per_ballot, self.max_votes_per_ballot, self.candidate_count
            )));
        }

        Ok(())
    }

    /// Whether `now` is inside the voting window
    pub fn in_window(&self, now: u64) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    pub(crate) fn out_of_window(&self, now: u64) -> Error {
        Error::OutOfWindow {
            now,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// The committed state of one election.
///
/// Rosters are held as roots only. Everything a transition needs beyond this is supplied by
/// the caller as witnesses and checked against these roots.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionState {
    pub election_id: ElectionId,
    pub phase: Phase,
    pub params: ElectionParams,

    pub voters_root: FieldElement,
    pub voters_root_version: u64,

    /// Candidate roster as committed at start, every count zero. Votes are checked against it.
    pub candidates_root: FieldElement,
    pub candidates_root_version: u64,

    pub commitments_root: FieldElement,

    /// Candidate roster with every folded vote counted
    pub committed_candidates_root: FieldElement,

    /// Log cursor of the last action folded into `committed_candidates_root`
    pub accumulated_actions_cursor: FieldElement,

    /// Key allowed to sign roster updates, if any
    #[serde(with = "EdPublicKeyHexOption")]
    #[serde(default)]
    pub custodian: Option<VerifyingKey>,
}

impl ElectionState {
    /// An unstarted election with every tree empty
    pub fn new<H: FieldHasher>(election_id: ElectionId, config: &ElectionConfig, hasher: &H) -> Self {
        let empty_candidates = empty_root(hasher, config.candidate_tree_height);
        ElectionState {
            election_id,
            phase: Phase::Unstarted,
            params: ElectionParams::default(),
            voters_root: empty_root(hasher, config.voter_tree_height),
            voters_root_version: 0,
            candidates_root: empty_candidates,
            candidates_root_version: 0,
            commitments_root: empty_root(hasher, config.commitment_tree_height),
            committed_candidates_root: empty_candidates,
            accumulated_actions_cursor: ActionLog::initial_cursor(hasher),
            custodian: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Serialize to CBOR
    pub fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(&self)?)
    }

    /// Load from CBOR, or from JSON if the bytes are a JSON object.
    ///
    /// A CBOR map can be valid UTF-8, so text that does not open with `{` is still read as CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let opens_object = bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');
        match content_inspector::inspect(bytes) {
            ContentType::UTF_8 if opens_object => Ok(serde_json::from_slice(bytes)?),
            ContentType::UTF_8 | ContentType::BINARY => Ok(serde_cbor::from_slice(bytes)?),
            _ => Err(Error::DeserializationUnknownFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_validation() {
        let config = ElectionConfig::default();
        let now = 1_000;

        ElectionParams::new(2_000, 3_000, 5, 3)
            .validate(&config, now)
            .unwrap();

        // Voting may already be open at start
        ElectionParams::new(500, 3_000, 5, 3)
            .validate(&config, now)
            .unwrap();

        let bad = vec![
            ElectionParams::new(3_000, 3_000, 5, 3),
            ElectionParams::new(3_000, 2_000, 5, 3),
            ElectionParams::new(0, 1_000, 5, 3),
            ElectionParams::new(2_000, 3_000, 0, 3),
            ElectionParams::new(2_000, 3_000, 101, 3),
            ElectionParams::new(2_000, 3_000, 5, 0),
            ElectionParams::new(2_000, 3_000, 5, 1_000_001),
            ElectionParams {
                min_votes_per_ballot: 2,
                max_votes_per_ballot: 1,
                ..ElectionParams::new(2_000, 3_000, 5, 3)
            },
            ElectionParams {
                max_votes_per_ballot: 6,
                ..ElectionParams::new(2_000, 3_000, 5, 3)
            },
            ElectionParams {
                is_multiple_allowed: true,
                ..ElectionParams::new(2_000, 3_000, 5, 3)
            },
        ];
        for params in bad {
            assert!(matches!(
                params.validate(&config, now),
                Err(Error::InvalidParameters(_))
            ));
        }
    }

    #[test]
    fn multiple_votes_params() {
        let config = ElectionConfig::default();
        let cumulative = ElectionParams {
            min_votes_per_ballot: 1,
            max_votes_per_ballot: 8,
            is_multiple_allowed: true,
            ..ElectionParams::new(2_000, 3_000, 5, 3)
        };
        cumulative.validate(&config, 1_000).unwrap();

        // Without the flag the same bounds exceed the candidate count
        let single = ElectionParams {
            is_multiple_allowed: false,
            ..cumulative.clone()
        };
        assert!(matches!(
            single.validate(&config, 1_000),
            Err(Error::InvalidParameters(_))
        ));

        // Older states without the flag still load
        let mut value = serde_json::to_value(&single).unwrap();
        value.as_object_mut().unwrap().remove("is_multiple_allowed");
        let back: ElectionParams = serde_json::from_value(value).unwrap();
        assert_eq!(back, single);
    }

    #[test]
    fn window_is_inclusive() {
        let params = ElectionParams::new(10, 20, 2, 2);
        assert!(!params.in_window(9));
        assert!(params.in_window(10));
        assert!(params.in_window(20));
        assert!(!params.in_window(21));
    }

    #[test]
    fn persistence() {
        let hasher = Sha256Hasher;
        let config = ElectionConfig::default();
        let mut state = ElectionState::new(ElectionId::new_random(), &config, &hasher);
        state.custodian = Some(generate_keypair().1);
        state.params = ElectionParams::new(1, 2, 3, 4);
        assert!(!state.is_finished());
        assert_eq!(
            state.commitments_root,
            empty_root(&hasher, config.commitment_tree_height)
        );

        let cbor = state.as_bytes().unwrap();
        assert_eq!(ElectionState::from_bytes(&cbor).unwrap(), state);

        let json = serde_json::to_vec(&state).unwrap();
        assert_eq!(ElectionState::from_bytes(&json).unwrap(), state);

        // No custodian field at all
        state.custodian = None;
        let mut value = serde_json::to_value(&state).unwrap();
        value.as_object_mut().unwrap().remove("custodian");
        let json = serde_json::to_vec(&value).unwrap();
        assert_eq!(ElectionState::from_bytes(&json).unwrap(), state);
    }

    #[test]
    fn cbor_without_nul_bytes() {
        let hasher = Sha256Hasher;
        let config = ElectionConfig::default();
        let mut state = ElectionState::new(ElectionId::new_random(), &config, &hasher);
        state.phase = Phase::Open;
        state.params = ElectionParams::new(1000, 2000, 5, 3);
        state.voters_root_version = 1;
        state.candidates_root_version = 1;
        state.custodian = Some(generate_keypair().1);

        let cbor = state.as_bytes().unwrap();
        assert_eq!(ElectionState::from_bytes(&cbor).unwrap(), state);

        let json = serde_json::to_vec_pretty(&state).unwrap();
        assert_eq!(ElectionState::from_bytes(&json).unwrap(), state);

        assert!(ElectionState::from_bytes(b"not a state").is_err());
    }
}
