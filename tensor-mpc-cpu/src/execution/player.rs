use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of parties holding shares.
pub const NUM_PARTIES: usize = 2;

/// Position of a party in the two-party protocol.
///
/// Party 0 is the one that adds the public cross-term in the Beaver online
/// phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    P0,
    P1,
}

impl Role {
    pub fn new(index: usize) -> Result<Self, Error> {
        match index {
            0 => Ok(Role::P0),
            1 => Ok(Role::P1),
            _ => Err(Error::Id(index)),
        }
    }

    /// Zero based index of the party.
    pub fn index(&self) -> usize {
        match self {
            Role::P0 => 0,
            Role::P1 => 1,
        }
    }

    pub fn peer(&self) -> Self {
        match self {
            Role::P0 => Role::P1,
            Role::P1 => Role::P0,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.index())
    }
}

/// Runtime identity of party.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Default for Identity {
    fn default() -> Self {
        Identity("test_identity".to_string())
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity(s)
    }
}
