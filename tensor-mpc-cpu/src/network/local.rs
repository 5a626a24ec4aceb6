use crate::{execution::player::Identity, network::Networking};
use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use dashmap::DashMap;
use eyre::{eyre, Result};
use std::sync::Arc;
use tracing::trace;

/// Directed link `from -> to`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Link {
    from: Identity,
    to:   Identity,
}

type Channel = (Sender<Vec<u8>>, Receiver<Vec<u8>>);

/// In-memory transport with one unbounded FIFO per directed link between
/// the registered parties.
#[derive(Debug, Clone)]
pub struct LocalNetworkingStore {
    links: Arc<DashMap<Link, Channel>>,
}

impl LocalNetworkingStore {
    pub fn from_host_ids(identities: &[Identity]) -> Self {
        let links = DashMap::new();
        for from in identities {
            for to in identities.iter().filter(|to| *to != from) {
                let link = Link {
                    from: from.clone(),
                    to:   to.clone(),
                };
                links.insert(link, async_channel::unbounded());
            }
        }
        Self {
            links: Arc::new(links),
        }
    }

    /// Endpoint through which `owner` talks to every other party.
    pub fn get_local_network(&self, owner: Identity) -> LocalNetworking {
        LocalNetworking {
            links: Arc::clone(&self.links),
            owner,
        }
    }
}

#[derive(Debug)]
pub struct LocalNetworking {
    links:     Arc<DashMap<Link, Channel>>,
    pub owner: Identity,
}

impl LocalNetworking {
    fn channel(&self, from: &Identity, to: &Identity) -> Result<Channel> {
        let link = Link {
            from: from.clone(),
            to:   to.clone(),
        };
        self.links
            .get(&link)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| eyre!("no local link from {from:?} to {to:?}"))
    }
}

#[async_trait]
impl Networking for LocalNetworking {
    async fn send(&self, value: Vec<u8>, receiver: &Identity) -> Result<()> {
        let (tx, _) = self.channel(&self.owner, receiver)?;
        trace!(bytes = value.len(), to = ?receiver, "local send");
        tx.send(value)
            .await
            .map_err(|_| eyre!("link to {receiver:?} is closed"))
    }

    async fn receive(&self, sender: &Identity) -> Result<Vec<u8>> {
        let (_, rx) = self.channel(sender, &self.owner)?;
        Ok(rx.recv().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::value::NetworkValue;

    fn store() -> LocalNetworkingStore {
        LocalNetworkingStore::from_host_ids(&["alice".into(), "bob".into()])
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let store = store();
        let alice = store.get_local_network("alice".into());
        let bob = store.get_local_network("bob".into());

        let receiver = tokio::spawn(async move {
            let first = NetworkValue::from_network(bob.receive(&"alice".into()).await);
            let second = NetworkValue::from_network(bob.receive(&"alice".into()).await);
            (first.unwrap(), second.unwrap())
        });
        let sender = tokio::spawn(async move {
            for id in [777, 778] {
                alice
                    .send(NetworkValue::TripleId(id).to_network()?, &"bob".into())
                    .await?;
            }
            eyre::Ok(())
        });

        let (received, sent) = tokio::try_join!(receiver, sender).unwrap();
        sent.unwrap();
        assert_eq!(
            received,
            (NetworkValue::TripleId(777), NetworkValue::TripleId(778))
        );
    }

    #[tokio::test]
    async fn test_links_are_directed() {
        let store = store();
        let alice = store.get_local_network("alice".into());
        let bob = store.get_local_network("bob".into());

        alice.send(vec![1], &"bob".into()).await.unwrap();
        bob.send(vec![2], &"alice".into()).await.unwrap();
        assert_eq!(alice.receive(&"bob".into()).await.unwrap(), vec![2]);
        assert_eq!(bob.receive(&"alice".into()).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_an_error() {
        let alice = store().get_local_network("alice".into());
        assert!(alice.send(vec![1], &"charlie".into()).await.is_err());
        assert!(alice.receive(&"alice".into()).await.is_err());
    }
}
