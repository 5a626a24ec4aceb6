use super::operator::{BilinearOp, OpKind};
use crate::{
    error::{Error, Result},
    execution::player::Role,
    shares::{IntRing2k, RingTensor, ShareGenerator, SharedTensor},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Default bit length of the random triple material.
pub const DEFAULT_BIT_LENGTH: u32 = 64;

/// How the output of the online phase is shared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSharing {
    /// Each party computes its own output share from the opened masks and its
    /// triple shares. The product is never reconstructed.
    #[default]
    Split,
    /// The product is reconstructed and then shared again uniformly. This
    /// reveals the product to the party running it.
    Reshare,
}

/// Correlated randomness `(A, B, C = op(A, B))`, secret shared.
///
/// A triple is bound to the operator and operand shapes it was generated for
/// and is consumed by value, so it cannot feed two multiplications.
#[derive(Debug)]
pub struct Triple<T: IntRing2k> {
    id:        u64,
    kind:      OpKind,
    lhs_shape: Vec<usize>,
    rhs_shape: Vec<usize>,
    a:         SharedTensor<T>,
    b:         SharedTensor<T>,
    c:         SharedTensor<T>,
}

/// One party's half of a [`Triple`].
#[derive(Debug)]
pub struct TripleShare<T: IntRing2k> {
    pub id:        u64,
    pub role:      Role,
    pub kind:      OpKind,
    pub lhs_shape: Vec<usize>,
    pub rhs_shape: Vec<usize>,
    pub a:         RingTensor<T>,
    pub b:         RingTensor<T>,
    pub c:         RingTensor<T>,
}

fn check_binding(
    kind: OpKind,
    lhs_shape: &[usize],
    rhs_shape: &[usize],
    expected_kind: OpKind,
    x_shape: &[usize],
    y_shape: &[usize],
) -> Result<()> {
    if kind != expected_kind {
        return Err(Error::ProtocolMisuse(format!(
            "triple generated for {kind} used with {expected_kind}"
        )));
    }
    if lhs_shape != x_shape || rhs_shape != y_shape {
        return Err(Error::ProtocolMisuse(format!(
            "triple generated for shapes {lhs_shape:?} x {rhs_shape:?} used with {x_shape:?} x \
             {y_shape:?}"
        )));
    }
    Ok(())
}

impl<T: IntRing2k> Triple<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn a(&self) -> &SharedTensor<T> {
        &self.a
    }

    pub fn b(&self) -> &SharedTensor<T> {
        &self.b
    }

    pub fn c(&self) -> &SharedTensor<T> {
        &self.c
    }

    /// Fails with `ProtocolMisuse` unless the triple was generated for `kind`
    /// and exactly these operand shapes.
    pub fn check(&self, kind: OpKind, x_shape: &[usize], y_shape: &[usize]) -> Result<()> {
        check_binding(
            self.kind,
            &self.lhs_shape,
            &self.rhs_shape,
            kind,
            x_shape,
            y_shape,
        )
    }

    /// Whether `reconstruct(C) == op(reconstruct(A), reconstruct(B))`.
    /// Reconstructs the whole triple, so only meaningful for a dealer.
    pub fn is_consistent<O: BilinearOp>(&self, op: &O) -> Result<bool> {
        let expected = op.apply(&self.a.reconstruct(), &self.b.reconstruct())?;
        Ok(self.c.reconstruct() == expected)
    }

    /// Hands each party its half, tagged with a common id.
    pub fn split(self) -> [TripleShare<T>; 2] {
        let [a0, a1] = self.a.into_shares();
        let [b0, b1] = self.b.into_shares();
        let [c0, c1] = self.c.into_shares();
        let share = |role, a, b, c| TripleShare {
            id: self.id,
            role,
            kind: self.kind,
            lhs_shape: self.lhs_shape.clone(),
            rhs_shape: self.rhs_shape.clone(),
            a,
            b,
            c,
        };
        [share(Role::P0, a0, b0, c0), share(Role::P1, a1, b1, c1)]
    }
}

impl<T: IntRing2k> TripleShare<T> {
    pub fn check(&self, kind: OpKind, x_shape: &[usize], y_shape: &[usize]) -> Result<()> {
        check_binding(
            self.kind,
            &self.lhs_shape,
            &self.rhs_shape,
            kind,
            x_shape,
            y_shape,
        )
    }
}

/// Output share of one party given the opened masks `d = X - A` and
/// `e = Y - B` and its triple shares:
///
/// `Z_i = C_i + op(d, B_i) + op(A_i, e)`, plus `op(d, e)` for `P0` only, so
/// that the public cross-term is counted once.
pub(crate) fn party_output_share<O: BilinearOp, T: IntRing2k>(
    op: &O,
    role: Role,
    d: &RingTensor<T>,
    e: &RingTensor<T>,
    a_i: &RingTensor<T>,
    b_i: &RingTensor<T>,
    c_i: &RingTensor<T>,
) -> Result<RingTensor<T>> {
    let z = c_i
        .add(&op.apply(d, b_i)?)?
        .add(&op.apply(a_i, e)?)?;
    match role {
        Role::P0 => z.add(&op.apply(d, e)?),
        Role::P1 => Ok(z),
    }
}

/// Secure evaluation of a bilinear operator on two shared tensors with a
/// trusted dealer producing the triples.
#[derive(Debug)]
pub struct BeaverTripleProtocol<O: BilinearOp> {
    op:             O,
    bit_length:     u32,
    output_sharing: OutputSharing,
    generator:      ShareGenerator,
}

impl<O: BilinearOp> BeaverTripleProtocol<O> {
    pub fn new(op: O, generator: ShareGenerator) -> Self {
        Self {
            op,
            bit_length: DEFAULT_BIT_LENGTH,
            output_sharing: OutputSharing::default(),
            generator,
        }
    }

    pub fn with_bit_length(mut self, bit_length: u32) -> Self {
        self.bit_length = bit_length;
        self
    }

    pub fn with_output_sharing(mut self, output_sharing: OutputSharing) -> Self {
        self.output_sharing = output_sharing;
        self
    }

    pub fn op(&self) -> &O {
        &self.op
    }

    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    /// Samples `a`, `b` as random `bit_length`-bit tensors of the operand
    /// shapes, computes `c = op(a, b)` in the clear and shares all three
    /// uniformly.
    #[instrument(level = "debug", skip(self), fields(op = %self.op.kind()))]
    pub fn generate_triplets<T: IntRing2k>(
        &mut self,
        x_shape: &[usize],
        y_shape: &[usize],
    ) -> Result<Triple<T>> {
        self.op.output_shape(x_shape, y_shape)?;
        let a = self.generator.random_kbit_tensor::<T>(x_shape, self.bit_length)?;
        let b = self.generator.random_kbit_tensor::<T>(y_shape, self.bit_length)?;
        let c = self.op.apply(&a, &b)?;
        let id = self.generator.rng_mut().gen();
        debug!(triple_id = id, "Generated triple");

        Ok(Triple {
            id,
            kind: self.op.kind(),
            lhs_shape: x_shape.to_vec(),
            rhs_shape: y_shape.to_vec(),
            a: self.generator.share_uniform(&a)?,
            b: self.generator.share_uniform(&b)?,
            c: self.generator.share_uniform(&c)?,
        })
    }

    /// Online phase. Opens `d = X - A` and `e = Y - B` and combines them with
    /// the triple into shares of `op(X, Y)`.
    #[instrument(level = "debug", skip_all, fields(op = %self.op.kind(), triple_id = triple.id))]
    pub fn multiply<T: IntRing2k>(
        &mut self,
        x: &SharedTensor<T>,
        y: &SharedTensor<T>,
        triple: Triple<T>,
    ) -> Result<SharedTensor<T>> {
        self.op.output_shape(x.shape(), y.shape())?;
        triple.check(self.op.kind(), x.shape(), y.shape())?;

        let d = x.sub(&triple.a)?.reconstruct();
        let e = y.sub(&triple.b)?.reconstruct();

        match self.output_sharing {
            OutputSharing::Split => {
                let [z0, z1] = [Role::P0, Role::P1].map(|role| {
                    party_output_share(
                        &self.op,
                        role,
                        &d,
                        &e,
                        triple.a.share(role),
                        triple.b.share(role),
                        triple.c.share(role),
                    )
                });
                SharedTensor::from_shares(z0?, z1?)
            }
            OutputSharing::Reshare => {
                warn!("Reconstructing the product before resharing");
                let a = triple.a.reconstruct();
                let b = triple.b.reconstruct();
                let z = triple
                    .c
                    .reconstruct()
                    .add(&self.op.apply(&d, &b)?)?
                    .add(&self.op.apply(&a, &e)?)?
                    .add(&self.op.apply(&d, &e)?)?;
                self.generator.share_uniform(&z)
            }
        }
    }

    /// Generates a fresh triple and runs the online phase with it.
    pub fn call<T: IntRing2k>(
        &mut self,
        x: &SharedTensor<T>,
        y: &SharedTensor<T>,
    ) -> Result<SharedTensor<T>> {
        let triple = self.generate_triplets(x.shape(), y.shape())?;
        self.multiply(x, y, triple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::operator::{Conv2d, Elementwise, MatMul};
    use rstest::rstest;

    fn shared<T: IntRing2k>(
        gen: &mut ShareGenerator,
        shape: &[usize],
        values: &[i64],
    ) -> SharedTensor<T> {
        let t = RingTensor::from_signed(shape, values).unwrap();
        gen.share_uniform(&t).unwrap()
    }

    #[test]
    fn test_matmul_example_mod_2_16() {
        let mut gen = ShareGenerator::seed_from_u64(42);
        let x = shared::<u16>(&mut gen, &[2, 2], &[1, 2, 3, 4]);
        let y = shared::<u16>(&mut gen, &[2, 2], &[5, 6, 7, 8]);

        let mut protocol = BeaverTripleProtocol::new(MatMul, gen);
        let z = protocol.call(&x, &y).unwrap();
        assert_eq!(z.reconstruct().to_signed_vec(), vec![19, 22, 43, 50]);
    }

    #[rstest]
    fn test_matmul_random(
        #[values(OutputSharing::Split, OutputSharing::Reshare)] output_sharing: OutputSharing,
        #[values(8, 64)] bit_length: u32,
    ) {
        let mut gen = ShareGenerator::seed_from_u64(7);
        let xp = gen.random_tensor::<u64>(&[3, 5]);
        let yp = gen.random_tensor::<u64>(&[5, 2]);
        let x = gen.share_uniform(&xp).unwrap();
        let y = gen.share_uniform(&yp).unwrap();

        let mut protocol = BeaverTripleProtocol::new(MatMul, gen.fork())
            .with_bit_length(bit_length)
            .with_output_sharing(output_sharing);
        for _ in 0..3 {
            let z = protocol.call(&x, &y).unwrap();
            assert_eq!(z.reconstruct(), xp.matmul(&yp).unwrap());
        }
    }

    #[test]
    fn test_elementwise_in_small_ring() {
        let mut gen = ShareGenerator::seed_from_u64(8);
        let x = shared::<u8>(&mut gen, &[4], &[100, -3, 7, 0]);
        let y = shared::<u8>(&mut gen, &[4], &[3, -3, -1, 5]);
        let mut protocol = BeaverTripleProtocol::new(Elementwise, gen);
        let z = protocol.call(&x, &y).unwrap();
        // 300 mod 256 = 44
        assert_eq!(z.reconstruct().to_signed_vec(), vec![44, 9, -7, 0]);
    }

    #[test]
    fn test_triple_is_consistent() {
        let mut protocol =
            BeaverTripleProtocol::new(MatMul, ShareGenerator::seed_from_u64(9)).with_bit_length(16);
        assert_eq!(protocol.bit_length(), 16);
        let triple = protocol.generate_triplets::<u32>(&[2, 3], &[3, 4]).unwrap();
        assert!(triple.is_consistent(&MatMul).unwrap());
        assert_eq!(triple.c().shape(), &[2, 4]);
        let half = 1i128 << 15;
        for material in [triple.a(), triple.b()] {
            assert!(material
                .reconstruct()
                .to_signed_vec()
                .iter()
                .all(|v| (-half..half).contains(v)));
        }
    }

    #[test]
    fn test_shape_mismatch_before_triple_generation() {
        let mut gen = ShareGenerator::seed_from_u64(10);
        let x = shared::<u32>(&mut gen, &[2, 3], &[0; 6]);
        let y = shared::<u32>(&mut gen, &[2, 3], &[0; 6]);
        let mut protocol = BeaverTripleProtocol::new(MatMul, gen);
        assert!(matches!(protocol.call(&x, &y), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_triple_for_other_shapes_is_misuse() {
        let mut gen = ShareGenerator::seed_from_u64(11);
        let x = shared::<u32>(&mut gen, &[2, 2], &[1, 2, 3, 4]);
        let y = shared::<u32>(&mut gen, &[2, 2], &[1, 0, 0, 1]);
        let mut protocol = BeaverTripleProtocol::new(MatMul, gen);
        let triple = protocol.generate_triplets::<u32>(&[2, 3], &[3, 2]).unwrap();
        assert!(matches!(
            protocol.multiply(&x, &y, triple),
            Err(Error::ProtocolMisuse(_))
        ));
    }

    #[test]
    fn test_triple_for_other_operator_is_misuse() {
        let mut gen = ShareGenerator::seed_from_u64(12);
        let x = shared::<u32>(&mut gen, &[1, 1, 3, 3], &[1; 9]);
        let w = shared::<u32>(&mut gen, &[1, 1, 3, 3], &[1; 9]);

        let mut strided = BeaverTripleProtocol::new(
            Conv2d {
                stride:  2,
                padding: 1,
            },
            gen.fork(),
        );
        let triple = strided.generate_triplets::<u32>(x.shape(), w.shape()).unwrap();

        let mut plain = BeaverTripleProtocol::new(Conv2d::default(), gen);
        assert!(matches!(
            plain.multiply(&x, &w, triple),
            Err(Error::ProtocolMisuse(_))
        ));
    }

    #[test]
    fn test_split_shares_reconstruct_triple() {
        let mut protocol = BeaverTripleProtocol::new(MatMul, ShareGenerator::seed_from_u64(13));
        let triple = protocol.generate_triplets::<u64>(&[2, 2], &[2, 2]).unwrap();
        let id = triple.id();
        let c = triple.c().reconstruct();
        let [t0, t1] = triple.split();
        assert_eq!((t0.id, t1.id), (id, id));
        assert_eq!((t0.role, t1.role), (Role::P0, Role::P1));
        assert_eq!(t0.c.add(&t1.c).unwrap(), c);
        assert!(t0.check(OpKind::MatMul, &[2, 2], &[2, 2]).is_ok());
        assert!(t1.check(OpKind::Elementwise, &[2, 2], &[2, 2]).is_err());
    }
}
