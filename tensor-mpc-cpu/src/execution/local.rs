use crate::{
    execution::{
        player::{Identity, Role, NUM_PARTIES},
        session::Session,
    },
    network::local::LocalNetworkingStore,
};
use eyre::{bail, eyre, Result};
use std::sync::Arc;

pub fn generate_local_identities() -> Vec<Identity> {
    vec![Identity::from("alice"), Identity::from("bob")]
}

/// Both parties of a computation running in one process over in-memory
/// channels.
#[derive(Debug, Clone)]
pub struct LocalRuntime {
    pub identities: Vec<Identity>,
    pub sessions:   Vec<Session>,
}

impl LocalRuntime {
    pub fn two_party() -> Result<Self> {
        Self::new(generate_local_identities())
    }

    /// Builds one session per identity. The first identity plays `P0`.
    pub fn new(identities: Vec<Identity>) -> Result<Self> {
        if identities.len() != NUM_PARTIES {
            bail!("expected {NUM_PARTIES} identities, got {}", identities.len());
        }
        let network = LocalNetworkingStore::from_host_ids(&identities);
        let sessions = identities
            .iter()
            .enumerate()
            .map(|(index, identity)| {
                Ok(Session {
                    own_role:      Role::new(index)?,
                    own_identity:  identity.clone(),
                    peer_identity: identities[1 - index].clone(),
                    networking:    Arc::new(network.get_local_network(identity.clone())),
                })
            })
            .collect::<Result<Vec<_>, crate::Error>>()?;
        Ok(LocalRuntime {
            identities,
            sessions,
        })
    }

    /// Consumes the runtime and hands out the sessions as `[P0, P1]`.
    pub fn into_sessions(self) -> Result<[Session; NUM_PARTIES]> {
        self.sessions
            .try_into()
            .map_err(|v: Vec<Session>| eyre!("expected two sessions, got {}", v.len()))
    }
}
