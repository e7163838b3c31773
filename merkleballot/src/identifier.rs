use crate::*;
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Election identifier
///
/// Plays the role of the contract address: it is bound into every public nullifier and every
/// signed root update, so identities and roster updates cannot be replayed across elections.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElectionId(pub [u8; 16]);

impl ElectionId {
    /// Create a new random election identifier
    pub fn new_random() -> Self {
        let mut csprng = rand::rngs::OsRng {};
        let election_id: [u8; 16] = csprng.gen();
        ElectionId(election_id)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let election_id: [u8; 16] = bytes.try_into().map_err(|_| Error::InvalidLength {
            expected: 16,
            found: bytes.len(),
        })?;
        Ok(ElectionId(election_id))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Encodes as a single element (128 bits never wrap the modulus)
impl Encode for ElectionId {
    fn encode(&self, out: &mut Vec<FieldElement>) {
        out.push(FieldElement::from_be_bytes_mod_order(&self.0));
    }
}

impl FromStr for ElectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for ElectionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        std::str::FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for ElectionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl std::fmt::Display for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
