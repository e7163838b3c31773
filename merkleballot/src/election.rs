use crate::*;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;

/// Roots and parameters an election is started with
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionSetup {
    pub params: ElectionParams,
    pub voters_root: FieldElement,
    pub candidates_root: FieldElement,

    /// Defaults to the empty commitment tree
    pub commitments_root: Option<FieldElement>,

    #[serde(with = "EdPublicKeyHexOption")]
    #[serde(default)]
    pub custodian: Option<VerifyingKey>,
}

impl ElectionSetup {
    pub fn new(params: ElectionParams, voters_root: FieldElement, candidates_root: FieldElement) -> Self {
        ElectionSetup {
            params,
            voters_root,
            candidates_root,
            commitments_root: None,
            custodian: None,
        }
    }

    pub fn with_commitments_root(mut self, commitments_root: FieldElement) -> Self {
        self.commitments_root = Some(commitments_root);
        self
    }

    /// Allow `custodian` to sign voter and candidate roster updates before voting opens
    pub fn with_custodian(mut self, custodian: VerifyingKey) -> Self {
        self.custodian = Some(custodian);
        self
    }
}

/// An election state machine.
///
/// Holds the committed state and the action log, and exposes every transition. A transition
/// either succeeds and replaces the committed state, or fails and leaves it untouched.
pub struct Election<C: Clock, H: FieldHasher = Sha256Hasher> {
    config: ElectionConfig,
    hasher: H,
    clock: C,
    state: ElectionState,
    log: ActionLog,
}

impl<C: Clock> Election<C, Sha256Hasher> {
    /// Create a new unstarted election with a random identifier
    pub fn new(config: ElectionConfig, clock: C) -> Result<Self, Error> {
        Self::with_hasher(config, clock, Sha256Hasher)
    }
}

impl<C: Clock, H: FieldHasher> Election<C, H> {
    pub fn with_hasher(config: ElectionConfig, clock: C, hasher: H) -> Result<Self, Error> {
        config.validate()?;
        let state = ElectionState::new(ElectionId::new_random(), &config, &hasher);
        let log = ActionLog::new(&hasher);

        Ok(Election {
            config,
            hasher,
            clock,
            state,
            log,
        })
    }

    /// Resume an election from persisted state and its action log
    pub fn restore(
        config: ElectionConfig,
        clock: C,
        hasher: H,
        state: ElectionState,
        log: ActionLog,
    ) -> Result<Self, Error> {
        config.validate()?;

        if !log.verify(&hasher) {
            return Err(Error::CorruptActionLog);
        }
        if !log.contains_cursor(state.accumulated_actions_cursor) {
            return Err(Error::UnknownCursor);
        }

        Ok(Election {
            config,
            hasher,
            clock,
            state,
            log,
        })
    }

    pub fn id(&self) -> ElectionId {
        self.state.election_id
    }

    pub fn state(&self) -> &ElectionState {
        &self.state
    }

    pub fn params(&self) -> &ElectionParams {
        &self.state.params
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Every vote action dispatched so far
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Actions dispatched but not yet folded into the committed candidate root
    pub fn pending_actions(&self) -> Result<Vec<&VoteAction>, Error> {
        self.log.since(self.state.accumulated_actions_cursor)
    }

    fn require_open(&self) -> Result<(), Error> {
        match self.state.phase {
            Phase::Unstarted => Err(Error::NotStarted),
            Phase::Open => Ok(()),
            Phase::Finished => Err(Error::AlreadyFinished),
        }
    }

    fn require_voting_window(&self) -> Result<(), Error> {
        let now = self.clock.now();
        if !self.state.params.in_window(now) {
            return Err(self.state.params.out_of_window(now));
        }
        Ok(())
    }

    // Registration and re-salting stay possible from start until voting closes
    fn require_before_end(&self) -> Result<(), Error> {
        let now = self.clock.now();
        if now > self.state.params.end_time {
            return Err(self.state.params.out_of_window(now));
        }
        Ok(())
    }

    /// Authenticate the caller's unvoted voter leaf and return the root with it marked voted
    fn spend_voter(
        &self,
        voter: &Voter,
        witness: &MerkleWitness,
    ) -> Result<FieldElement, Error> {
        witness.check_height(self.config.voter_tree_height)?;
        if !witness.verify(&self.hasher, voter.leaf_hash(&self.hasher), self.state.voters_root) {
            return Err(Error::RootMismatch);
        }
        Ok(witness.compute_root(&self.hasher, voter.vote().leaf_hash(&self.hasher)))
    }

    /// Check a vote for `candidate_id` against the candidate roster as committed at start
    fn candidate_action(
        &self,
        candidate_id: u32,
        witness: &MerkleWitness,
    ) -> Result<VoteAction, Error> {
        witness.check_height(self.config.candidate_tree_height)?;

        if candidate_id >= self.state.params.candidate_count {
            return Err(Error::InvalidVoteShape(format!(
                "candidate {} does not exist, election has {} candidates",
                candidate_id, self.state.params.candidate_count
            )));
        }
        if witness.index() != candidate_id as u64 {
            return Err(Error::InvalidVoteShape(format!(
                "witness leads to leaf {}, not candidate {}",
                witness.index(),
                candidate_id
            )));
        }

        let leaf = Candidate::new(candidate_id).leaf_hash(&self.hasher);
        if !witness.verify(&self.hasher, leaf, self.state.candidates_root) {
            return Err(Error::RootMismatch);
        }

        Ok(VoteAction::new(candidate_id, witness.clone()))
    }

    /// Open the election.
    ///
    /// The supplied roots are committed as given; they are trusted to match the published rosters.
    pub fn start(&mut self, setup: ElectionSetup) -> Result<(), Error> {
        match self.state.phase {
            Phase::Unstarted => {}
            Phase::Open => return Err(Error::AlreadyStarted),
            Phase::Finished => return Err(Error::AlreadyFinished),
        }

        setup.params.validate(&self.config, self.clock.now())?;

        let commitments_root = setup
            .commitments_root
            .unwrap_or_else(|| empty_root(&self.hasher, self.config.commitment_tree_height));

        let mut next = self.state.clone();
        next.phase = Phase::Open;
        next.params = setup.params;
        next.voters_root = setup.voters_root;
        next.candidates_root = setup.candidates_root;
        next.committed_candidates_root = setup.candidates_root;
        next.commitments_root = commitments_root;
        next.accumulated_actions_cursor = self.log.tip();
        next.custodian = setup.custodian;
        self.state = next;

        tracing::info!(
            election = %self.state.election_id,
            start_time = self.state.params.start_time,
            end_time = self.state.params.end_time,
            candidates = self.state.params.candidate_count,
            voters = self.state.params.voter_count,
            "election started"
        );

        Ok(())
    }

    /// Confirm `candidates_root` is the current committed candidate root
    pub fn check_candidates(&self, candidates_root: FieldElement) -> Result<(), Error> {
        if candidates_root != self.state.committed_candidates_root {
            return Err(Error::RootMismatch);
        }
        Ok(())
    }

    /// Re-salt the caller's voter leaf. Returns the new voters root.
    pub fn set_password(
        &mut self,
        private_key: &SigningKey,
        old_password: FieldElement,
        new_password: FieldElement,
        voter_witness: &MerkleWitness,
    ) -> Result<FieldElement, Error> {
        self.require_open()?;
        self.require_before_end()?;
        voter_witness.check_height(self.config.voter_tree_height)?;

        let voter = Voter::from_private_key(private_key, old_password);
        if !voter_witness.verify(&self.hasher, voter.leaf_hash(&self.hasher), self.state.voters_root) {
            return Err(Error::RootMismatch);
        }

        let salted = voter.set_password(new_password);
        let voters_root = voter_witness.compute_root(&self.hasher, salted.leaf_hash(&self.hasher));
        self.state.voters_root = voters_root;

        tracing::info!(
            election = %self.state.election_id,
            voter = voter_witness.index(),
            "voter password changed"
        );

        Ok(voters_root)
    }

    /// Trade the caller's voter leaf for an anonymous credential in the commitment tree.
    ///
    /// The voter leaf is consumed, so the same key can no longer vote directly or register
    /// again. `commitment_witness` must lead to an empty slot.
    pub fn commit_identity(
        &mut self,
        private_key: &SigningKey,
        password: FieldElement,
        nullifier_secret: FieldElement,
        voter_witness: &MerkleWitness,
        commitment_witness: &MerkleWitness,
    ) -> Result<IdentityCommitment, Error> {
        self.require_open()?;
        self.require_before_end()?;
        commitment_witness.check_height(self.config.commitment_tree_height)?;

        let voter = Voter::from_private_key(private_key, password);
        let voters_root = self.spend_voter(&voter, voter_witness)?;

        if !commitment_witness.verify(&self.hasher, FieldElement::zero(), self.state.commitments_root) {
            return Err(Error::RootMismatch);
        }

        let identity = IdentityCommitment::derive(
            &self.hasher,
            self.state.election_id,
            private_key,
            nullifier_secret,
        );
        let commitments_root =
            commitment_witness.compute_root(&self.hasher, identity.leaf_hash(&self.hasher));

        self.state.voters_root = voters_root;
        self.state.commitments_root = commitments_root;

        tracing::info!(
            election = %self.state.election_id,
            slot = commitment_witness.index(),
            nullifier = %identity.public_nullifier,
            "identity committed"
        );

        Ok(identity)
    }

    /// Cast a vote for `candidate_id`. Returns the new voters root.
    ///
    /// The vote is dispatched to the action log; candidate counts only change at tally.
    pub fn vote(
        &mut self,
        private_key: &SigningKey,
        password: FieldElement,
        candidate_id: u32,
        voter_witness: &MerkleWitness,
        candidate_witness: &MerkleWitness,
    ) -> Result<FieldElement, Error> {
        self.require_open()?;
        self.require_voting_window()?;

        let voter = Voter::from_private_key(private_key, password);
        let voters_root = self.spend_voter(&voter, voter_witness)?;
        let action = self.candidate_action(candidate_id, candidate_witness)?;

        self.state.voters_root = voters_root;
        let cursor = self.log.append(&self.hasher, action);

        tracing::info!(
            election = %self.state.election_id,
            candidate = candidate_id,
            cursor = %cursor,
            "vote dispatched"
        );

        Ok(voters_root)
    }

    /// Cast a vote with a registered credential. Returns the new commitments root.
    pub fn vote_anonymously(
        &mut self,
        private_key: &SigningKey,
        nullifier_secret: FieldElement,
        candidate_id: u32,
        identity_witness: &MerkleWitness,
        candidate_witness: &MerkleWitness,
    ) -> Result<FieldElement, Error> {
        self.require_open()?;
        self.require_voting_window()?;
        identity_witness.check_height(self.config.commitment_tree_height)?;

        let identity = IdentityCommitment::derive(
            &self.hasher,
            self.state.election_id,
            private_key,
            nullifier_secret,
        );
        if !identity_witness.verify(
            &self.hasher,
            identity.leaf_hash(&self.hasher),
            self.state.commitments_root,
        ) {
            return Err(Error::RootMismatch);
        }
        let commitments_root =
            identity_witness.compute_root(&self.hasher, identity.vote().leaf_hash(&self.hasher));

        let action = self.candidate_action(candidate_id, candidate_witness)?;

        self.state.commitments_root = commitments_root;
        let cursor = self.log.append(&self.hasher, action);

        tracing::info!(
            election = %self.state.election_id,
            candidate = candidate_id,
            nullifier = %identity.public_nullifier,
            cursor = %cursor,
            "anonymous vote dispatched"
        );

        Ok(commitments_root)
    }

    /// Cast a ballot. `candidate_witnesses` holds one witness per vote, in the order
    /// `Ballot::selections` lists them. Returns the new voters root.
    pub fn vote_ballot(
        &mut self,
        private_key: &SigningKey,
        password: FieldElement,
        ballot: &Ballot,
        voter_witness: &MerkleWitness,
        candidate_witnesses: &[MerkleWitness],
    ) -> Result<FieldElement, Error> {
        self.require_open()?;
        self.require_voting_window()?;

        let selections = ballot.selections(&self.state.params)?;
        if selections.len() != candidate_witnesses.len() {
            return Err(Error::InvalidVoteShape(format!(
                "ballot marks {} candidates but {} witnesses were supplied",
                selections.len(),
                candidate_witnesses.len()
            )));
        }

        let voter = Voter::from_private_key(private_key, password);
        let voters_root = self.spend_voter(&voter, voter_witness)?;

        let actions = selections
            .iter()
            .zip(candidate_witnesses)
            .map(|(candidate_id, witness)| self.candidate_action(*candidate_id, witness))
            .collect::<Result<Vec<_>, _>>()?;

        self.state.voters_root = voters_root;
        for action in actions {
            self.log.append(&self.hasher, action);
        }

        tracing::info!(
            election = %self.state.election_id,
            marks = selections.len(),
            cursor = %self.log.tip(),
            "ballot dispatched"
        );

        Ok(voters_root)
    }

    /// Close the election and count every pending vote into the candidate roster.
    ///
    /// `candidates` is the off-chain candidate roster; it must match the committed candidate
    /// root. The counted roster is returned so the caller can store it.
    pub fn tally(
        &mut self,
        candidates: &Roster<Candidate, H>,
    ) -> Result<Roster<Candidate, H>, Error> {
        self.require_open()?;

        let now = self.clock.now();
        if now <= self.state.params.end_time {
            return Err(self.state.params.out_of_window(now));
        }

        if candidates.height() != self.config.candidate_tree_height {
            return Err(Error::height(
                self.config.candidate_tree_height,
                candidates.height(),
            ));
        }
        self.check_candidates(candidates.root())?;

        let pending = self.pending_actions()?;
        let folded = pending.len();
        let accumulator = TallyAccumulator::new(
            candidates.clone(),
            self.state.accumulated_actions_cursor,
        )
        .reduce(pending)?;

        let mut next = self.state.clone();
        next.committed_candidates_root = accumulator.root();
        next.accumulated_actions_cursor = accumulator.cursor;
        next.phase = Phase::Finished;
        self.state = next;

        tracing::info!(
            election = %self.state.election_id,
            actions = folded,
            root = %self.state.committed_candidates_root,
            "election tallied"
        );

        Ok(accumulator.roster)
    }

    /// The vote count of `candidate`, proven against the committed candidate root
    pub fn count(&self, candidate: &Candidate, witness: &MerkleWitness) -> Result<u64, Error> {
        if self.state.phase == Phase::Unstarted {
            return Err(Error::NotStarted);
        }

        witness.check_height(self.config.candidate_tree_height)?;
        if witness.index() != candidate.id as u64 {
            return Err(Error::InvalidVoteShape(format!(
                "witness leads to leaf {}, not candidate {}",
                witness.index(),
                candidate.id
            )));
        }
        if !witness.verify(
            &self.hasher,
            candidate.leaf_hash(&self.hasher),
            self.state.committed_candidates_root,
        ) {
            return Err(Error::RootMismatch);
        }

        Ok(candidate.vote_count)
    }

    /// Look `candidate_id` up in a candidate store and count it
    pub fn count_from<S: RosterStore<Candidate>>(
        &self,
        store: &S,
        candidate_id: u32,
    ) -> Result<u64, Error> {
        let index = candidate_id as u64;
        let candidate = store.get(index).ok_or_else(|| {
            Error::InvalidVoteShape(format!("no candidate {} in roster", candidate_id))
        })?;
        let witness = store.witness(index)?;
        self.count(candidate, &witness)
    }

    /// Apply a custodian-signed update to the voter or candidate roster.
    ///
    /// Only possible while the election is open and voting has not begun.
    pub fn apply_roster_update(
        &mut self,
        kind: RosterKind,
        updates: &[LeafUpdate],
        signed: &Signed<RootCommitment>,
    ) -> Result<FieldElement, Error> {
        self.require_open()?;
        let custodian = self.state.custodian.ok_or(Error::NoCustodian)?;

        let now = self.clock.now();
        if now >= self.state.params.start_time {
            return Err(self.state.params.out_of_window(now));
        }

        let (root, version, height) = match kind {
            RosterKind::Voters => (
                self.state.voters_root,
                self.state.voters_root_version,
                self.config.voter_tree_height,
            ),
            RosterKind::Candidates => (
                self.state.candidates_root,
                self.state.candidates_root_version,
                self.config.candidate_tree_height,
            ),
            RosterKind::Commitments => {
                return Err(Error::InvalidParameters(
                    "the commitment roster only changes through commit_identity".into(),
                ))
            }
        };

        let current = RootCommitment {
            election_id: self.state.election_id,
            roster: kind,
            version,
            root,
        };
        let accepted =
            verify_root_update(&self.hasher, &custodian, height, &current, updates, signed)?;

        let mut next = self.state.clone();
        match kind {
            RosterKind::Voters => {
                next.voters_root = accepted.root;
                next.voters_root_version = accepted.version;
            }
            RosterKind::Candidates => {
                // Nothing can have been dispatched before voting opens
                next.candidates_root = accepted.root;
                next.committed_candidates_root = accepted.root;
                next.candidates_root_version = accepted.version;
            }
            RosterKind::Commitments => {}
        }
        self.state = next;

        tracing::info!(
            election = %self.state.election_id,
            roster = %kind,
            version = accepted.version,
            root = %accepted.root,
            "roster updated"
        );

        Ok(accepted.root)
    }
}
