//! Protocol steps run by one party that only holds its own shares and talks
//! to its peer through a [`Session`].

use super::{
    beaver::{party_output_share, TripleShare},
    operator::BilinearOp,
};
use crate::{
    error::{Error, Result},
    execution::session::Session,
    network::value::NetworkValue,
    shares::{IntRing2k, RingTensor},
};
use eyre::eyre;
use tracing::{instrument, trace};

/// Sends the own share, receives the peer's and returns their sum.
#[instrument(level = "trace", target = "two_party::network", skip_all)]
pub async fn open_tensor<T: IntRing2k>(
    session: &Session,
    share: &RingTensor<T>,
) -> Result<RingTensor<T>> {
    session
        .send_peer(NetworkValue::from_tensor(share)?)
        .await?;
    let peer_share = session.receive_peer().await?.into_tensor::<T>()?;
    share.add(&peer_share)
}

/// Online phase of the Beaver protocol for one party.
///
/// Both masked differences go out in a single message together with the
/// triple id, so the step costs one round. A peer that used a different
/// triple is detected before any output is produced.
#[instrument(level = "debug", skip_all, fields(role = %session.own_role(), triple_id = triple.id))]
pub async fn beaver_online<O: BilinearOp, T: IntRing2k>(
    session: &Session,
    op: &O,
    x_i: &RingTensor<T>,
    y_i: &RingTensor<T>,
    triple: TripleShare<T>,
) -> Result<RingTensor<T>> {
    let role = session.own_role();
    op.output_shape(x_i.shape(), y_i.shape())?;
    triple.check(op.kind(), x_i.shape(), y_i.shape())?;
    if triple.role != role {
        return Err(Error::ProtocolMisuse(format!(
            "triple share for {} used by {role}",
            triple.role
        )));
    }

    let d_i = x_i.sub(&triple.a)?;
    let e_i = y_i.sub(&triple.b)?;
    session
        .send_peer(NetworkValue::Batch(vec![
            NetworkValue::TripleId(triple.id),
            NetworkValue::from_tensor(&d_i)?,
            NetworkValue::from_tensor(&e_i)?,
        ]))
        .await?;

    let mut received = session.receive_peer().await?.into_batch()?.into_iter();
    let mut next = || {
        received
            .next()
            .ok_or_else(|| eyre!("peer sent a truncated batch"))
    };
    let peer_id = next()?.into_triple_id()?;
    if peer_id != triple.id {
        return Err(Error::ProtocolMisuse(format!(
            "peer used triple {peer_id}, expected {}",
            triple.id
        )));
    }
    let d = d_i.add(&next()?.into_tensor::<T>()?)?;
    let e = e_i.add(&next()?.into_tensor::<T>()?)?;
    trace!("Opened masked inputs");

    party_output_share(op, role, &d, &e, &triple.a, &triple.b, &triple.c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        execution::{local::LocalRuntime, player::Role},
        protocol::{beaver::BeaverTripleProtocol, operator::MatMul},
        shares::ShareGenerator,
    };

    #[tokio::test]
    async fn test_open_tensor() {
        let [s0, s1] = LocalRuntime::two_party().unwrap().into_sessions().unwrap();
        let mut gen = ShareGenerator::seed_from_u64(1);
        let secret = RingTensor::<u32>::from_signed(&[2, 2], &[1, -2, 3, -4]).unwrap();
        let [x0, x1] = gen.share_uniform(&secret).unwrap().into_shares();

        let p0 = tokio::spawn(async move { open_tensor(&s0, &x0).await });
        let p1 = tokio::spawn(async move { open_tensor(&s1, &x1).await });
        let (r0, r1) = tokio::try_join!(p0, p1).unwrap();
        assert_eq!(r0.unwrap(), secret);
        assert_eq!(r1.unwrap(), secret);
    }

    #[tokio::test]
    async fn test_wrong_role_is_misuse() {
        let [s0, _s1] = LocalRuntime::two_party().unwrap().into_sessions().unwrap();
        let mut protocol = BeaverTripleProtocol::new(MatMul, ShareGenerator::seed_from_u64(2));
        let [_t0, t1] = protocol
            .generate_triplets::<u32>(&[1, 1], &[1, 1])
            .unwrap()
            .split();
        let x = RingTensor::<u32>::zeros(&[1, 1]);
        let res = beaver_online(&s0, &MatMul, &x, &x, t1).await;
        assert!(matches!(res, Err(Error::ProtocolMisuse(_))));
        assert_eq!(s0.own_role(), Role::P0);
    }
}
