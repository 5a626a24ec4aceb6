use crate::{
    execution::player::{Identity, Role},
    network::{value::NetworkValue, Networking},
};
use eyre::Result;
use std::sync::Arc;

pub type NetworkingImpl = Arc<dyn Networking + Send + Sync>;

/// One party's view of a two-party computation: its role, both identities
/// and a handle to the transport.
#[derive(Clone)]
pub struct Session {
    pub own_role:      Role,
    pub own_identity:  Identity,
    pub peer_identity: Identity,
    pub networking:    NetworkingImpl,
}

impl Session {
    pub fn own_role(&self) -> Role {
        self.own_role
    }

    pub async fn send_peer(&self, value: NetworkValue) -> Result<()> {
        self.networking
            .send(value.to_network()?, &self.peer_identity)
            .await
    }

    pub async fn receive_peer(&self) -> Result<NetworkValue> {
        NetworkValue::from_network(self.networking.receive(&self.peer_identity).await)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("own_role", &self.own_role)
            .field("own_identity", &self.own_identity)
            .field("peer_identity", &self.peer_identity)
            .finish_non_exhaustive()
    }
}
