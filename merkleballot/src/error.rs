use thiserror::Error;

/// The way a witness or index failed to fit a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Height { expected: usize, found: usize },
    Index { index: u64, height: usize },
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Shape::Height { expected, found } => {
                write!(f, "witness height {} does not match tree height {}", found, expected)
            }
            Shape::Index { index, height } => {
                write!(f, "leaf index {} out of bounds for tree of height {}", index, height)
            }
        }
    }
}

/// Error types
///
/// Every error aborts the transition that produced it. Nothing is committed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("merkleballot: invalid election parameters: {0}")]
    InvalidParameters(String),

    #[error("merkleballot: shape mismatch: {0}")]
    ShapeMismatch(Shape),

    #[error("merkleballot: witness does not match the committed root (not eligible or already acted)")]
    RootMismatch,

    #[error("merkleballot: time {now} is outside the allowed window [{start_time}, {end_time}]")]
    OutOfWindow {
        now: u64,
        start_time: u64,
        end_time: u64,
    },

    #[error("merkleballot: election is already finished")]
    AlreadyFinished,

    #[error("merkleballot: election is already started")]
    AlreadyStarted,

    #[error("merkleballot: election has not been started")]
    NotStarted,

    #[error("merkleballot: invalid vote: {0}")]
    InvalidVoteShape(String),

    #[error("merkleballot: stale root version: expected {expected}, found {found}")]
    StaleRootVersion { expected: u64, found: u64 },

    #[error("merkleballot: no custodian key committed for this election")]
    NoCustodian,

    #[error("merkleballot: signature error: {0}")]
    Signature(#[from] ed25519_dalek::SignatureError),

    #[error("merkleballot: signed root belongs to a different election or roster")]
    RootCommitmentMismatch,

    #[error("merkleballot: action cursor not found in log")]
    UnknownCursor,

    #[error("merkleballot: action log cursors do not match its contents")]
    CorruptActionLog,

    #[error("merkleballot: configuration error: {0}")]
    Config(String),

    #[error("merkleballot: invalid hexidecimal: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("merkleballot: field element is not in canonical form")]
    NonCanonicalField,

    #[error("merkleballot: invalid length: expected {expected} bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },

    #[error("merkleballot: CBOR error: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("merkleballot: JSON error: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("merkleballot: error deserializing: unknown format")]
    DeserializationUnknownFormat,
}

impl Error {
    /// Whether the caller may succeed by refreshing its witnesses (or waiting) and resubmitting.
    ///
    /// Structurally invalid requests return false and should not be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RootMismatch | Error::StaleRootVersion { .. } => true,
            Error::OutOfWindow { now, start_time, .. } => now < start_time,
            _ => false,
        }
    }

    pub(crate) fn height(expected: usize, found: usize) -> Self {
        Error::ShapeMismatch(Shape::Height { expected, found })
    }

    pub(crate) fn index(index: u64, height: usize) -> Self {
        Error::ShapeMismatch(Shape::Index { index, height })
    }
}
