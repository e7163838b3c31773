use crate::*;
use std::env::var;
use std::str::FromStr;

/// Max candidate count in an election
pub const MAX_CANDIDATE_COUNT: u32 = 100;

/// Max voter count in an election
pub const MAX_VOTER_COUNT: u32 = 1_000_000;

/// Tree heights and limits shared by every election run with this configuration.
///
/// Heights are fixed for the life of an election; witnesses built for any other height are
/// rejected as shape mismatches.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionConfig {
    pub voter_tree_height: usize,
    pub candidate_tree_height: usize,
    pub commitment_tree_height: usize,
    pub max_candidate_count: u32,
    pub max_voter_count: u32,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        ElectionConfig {
            voter_tree_height: 20,
            candidate_tree_height: 8,
            commitment_tree_height: 20,
            max_candidate_count: MAX_CANDIDATE_COUNT,
            max_voter_count: MAX_VOTER_COUNT,
        }
    }
}

impl ElectionConfig {
    /// Read the configuration from `MERKLEBALLOT_*` environment variables.
    ///
    /// Unset variables fall back to the defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ElectionConfig::default();

        let config = ElectionConfig {
            voter_tree_height: parse_or(
                &lookup,
                "MERKLEBALLOT_VOTER_TREE_HEIGHT",
                defaults.voter_tree_height,
            )?,
            candidate_tree_height: parse_or(
                &lookup,
                "MERKLEBALLOT_CANDIDATE_TREE_HEIGHT",
                defaults.candidate_tree_height,
            )?,
            commitment_tree_height: parse_or(
                &lookup,
                "MERKLEBALLOT_COMMITMENT_TREE_HEIGHT",
                defaults.commitment_tree_height,
            )?,
            max_candidate_count: parse_or(
                &lookup,
                "MERKLEBALLOT_MAX_CANDIDATE_COUNT",
                defaults.max_candidate_count,
            )?,
            max_voter_count: parse_or(
                &lookup,
                "MERKLEBALLOT_MAX_VOTER_COUNT",
                defaults.max_voter_count,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Every tree must be able to hold the largest roster it is configured for
    pub fn validate(&self) -> Result<(), Error> {
        let heights = [
            ("voter", self.voter_tree_height, self.max_voter_count),
            ("candidate", self.candidate_tree_height, self.max_candidate_count),
            ("commitment", self.commitment_tree_height, self.max_voter_count),
        ];

        for (name, height, needed) in heights.iter() {
            if *height == 0 || *height > MAX_TREE_HEIGHT {
                return Err(Error::Config(format!(
                    "{} tree height must be between 1 and {}",
                    name, MAX_TREE_HEIGHT
                )));
            }
            if (1u64 << *height) < *needed as u64 {
                return Err(Error::Config(format!(
                    "{} tree of height {} cannot hold {} leaves",
                    name, height, needed
                )));
            }
        }

        if self.max_candidate_count == 0 || self.max_voter_count == 0 {
            return Err(Error::Config("limits must be greater than zero".into()));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} is not a valid number: {}", key, val))),
        None => Ok(default),
    }
}
