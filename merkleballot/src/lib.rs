#[macro_use]
extern crate serde;

mod actions;
mod ballot;
mod candidate;
mod clock;
mod config;
mod election;
mod error;
mod field;
mod hash;
mod identifier;
mod merkle;
mod serde_hex;
mod state;
mod store;
mod sync;
mod tally;
mod util;
mod voter;

pub use actions::*;
pub use ballot::*;
pub use candidate::*;
pub use clock::*;
pub use config::*;
pub use election::*;
pub use error::*;
pub use field::*;
pub use hash::*;
pub use identifier::*;
pub use merkle::*;
pub use serde_hex::*;
pub use state::*;
pub use store::*;
pub use sync::*;
pub use tally::*;
pub use util::*;
pub use voter::*;
