use crate::execution::player::Identity;
use async_trait::async_trait;
use eyre::Result;

/// Requirements for networking.
#[async_trait]
pub trait Networking {
    async fn send(&self, value: Vec<u8>, receiver: &Identity) -> Result<()>;

    async fn receive(&self, sender: &Identity) -> Result<Vec<u8>>;
}

pub mod local;
pub mod value;
