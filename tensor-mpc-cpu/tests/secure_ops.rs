use eyre::Result;
use rstest::rstest;
use tensor_mpc_cpu::{
    protocol::{
        plain_conv2d, BeaverTripleProtocol, BilinearOp, Elementwise, MatMul, OutputSharing,
        SecureConv2d,
    },
    shares::{IntRing2k, RingTensor, ShareGenerator, ShareMode},
    Error,
};

#[test]
fn test_matmul_example_in_ring_2_16() -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(0);
    let x = RingTensor::<u16>::from_signed(&[2, 2], &[1, 2, 3, 4])?;
    let y = RingTensor::<u16>::from_signed(&[2, 2], &[5, 6, 7, 8])?;
    let x = gen.share_uniform(&x)?;
    let y = gen.share_uniform(&y)?;

    let mut protocol = BeaverTripleProtocol::new(MatMul, gen.fork()).with_bit_length(16);
    let z = protocol.call(&x, &y)?;
    assert_eq!(z.shape(), &[2, 2]);
    assert_eq!(z.reconstruct().to_signed_vec(), vec![19, 22, 43, 50]);
    Ok(())
}

fn beaver_matmul_test<T: IntRing2k>() -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(T::K as u64);
    let mut protocol = BeaverTripleProtocol::new(MatMul, gen.fork());
    for (m, k, n) in [(1, 1, 1), (4, 3, 2), (2, 7, 5)] {
        let xp = gen.random_tensor::<T>(&[m, k]);
        let yp = gen.random_tensor::<T>(&[k, n]);
        let x = gen.share_uniform(&xp)?;
        let y = gen.share_uniform(&yp)?;
        let z = protocol.call(&x, &y)?;
        assert_eq!(z.reconstruct(), xp.matmul(&yp)?);
    }
    Ok(())
}

macro_rules! test_impl {
    ($([$ty:ty,$fn:ident]),*) => ($(
        #[test]
        fn $fn() -> Result<()> {
            beaver_matmul_test::<$ty>()
        }
    )*)
}

test_impl! {
    [u8, beaver_matmul_u8],
    [u16, beaver_matmul_u16],
    [u32, beaver_matmul_u32],
    [u64, beaver_matmul_u64],
    [u128, beaver_matmul_u128]
}

#[rstest]
#[case(0, 1)]
#[case(1, 1)]
#[case(0, 2)]
#[case(2, 3)]
fn test_secure_conv_matches_plaintext(
    #[case] padding: usize,
    #[case] stride: usize,
    #[values(OutputSharing::Split, OutputSharing::Reshare)] output_sharing: OutputSharing,
) -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(100 + padding as u64 * 10 + stride as u64);
    let image = gen.random_positive_kbit_tensor::<u64>(&[2, 3, 8, 8], 8)?;
    let weights = gen.random_kbit_tensor::<u64>(&[4, 3, 3, 3], 64)?;
    let x = gen.share(&image, ShareMode::SameSign)?;
    let w = gen.share(&weights, ShareMode::Uniform)?;

    let mut conv = SecureConv2d::new(stride, padding, gen.fork()).with_output_sharing(output_sharing);
    let z = conv.forward(&x, &w)?;

    let expected = plain_conv2d(&image, &weights, padding, stride)?;
    assert_eq!(z.shape(), expected.shape());
    assert_eq!(z.reconstruct(), expected);
    Ok(())
}

#[test]
fn test_secure_conv_unbatched_input() -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(5);
    let image = gen.random_positive_kbit_tensor::<u32>(&[3, 5, 5], 8)?;
    let weights = gen.random_kbit_tensor::<u32>(&[2, 3, 3, 3], 8)?;
    let x = gen.share_uniform(&image)?;
    let w = gen.share_uniform(&weights)?;

    let mut conv = SecureConv2d::new(1, 1, gen.fork());
    let triple = conv.generate_triplets::<u32>(x.shape(), w.shape())?;
    assert!(triple.is_consistent(conv.op())?);
    let z = conv.forward_with_triple(&x, &w, triple)?;
    assert_eq!(z.shape(), &[2, 5, 5]);
    assert_eq!(z.reconstruct(), plain_conv2d(&image, &weights, 1, 1)?);
    Ok(())
}

#[test]
fn test_conv_channel_mismatch_fails_fast() -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(6);
    let x = gen.share_uniform(&RingTensor::<u64>::zeros(&[1, 2, 4, 4]))?;
    let w = gen.share_uniform(&RingTensor::<u64>::zeros(&[1, 3, 3, 3]))?;
    let mut conv = SecureConv2d::new(1, 0, gen.fork());
    assert!(matches!(conv.forward(&x, &w), Err(Error::ShapeMismatch(_))));
    Ok(())
}

#[rstest]
fn test_additive_homomorphism(
    #[values(ShareMode::Uniform, ShareMode::SameSign)] mode: ShareMode,
) -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(7);
    let xp = gen.random_kbit_tensor::<u32>(&[3, 4], 20)?;
    let yp = gen.random_kbit_tensor::<u32>(&[3, 4], 20)?;
    let x = gen.share(&xp, mode)?;
    let y = gen.share(&yp, mode)?;

    assert_eq!(x.reconstruct(), xp);
    assert_eq!(x.add(&y)?.reconstruct(), xp.add(&yp)?);
    assert_eq!(x.sub(&y)?.reconstruct(), xp.sub(&yp)?);
    Ok(())
}

#[test]
fn test_beaver_elementwise_wraps() -> Result<()> {
    let mut gen = ShareGenerator::seed_from_u64(8);
    let xp = RingTensor::<u16>::from_signed(&[3], &[256, -300, 32767])?;
    let yp = RingTensor::<u16>::from_signed(&[3], &[256, 2, 2])?;
    let x = gen.share_uniform(&xp)?;
    let y = gen.share_uniform(&yp)?;

    let mut protocol = BeaverTripleProtocol::new(Elementwise, gen.fork());
    let z = protocol.call(&x, &y)?;
    // 65536 = 0, -600, 65534 = -2
    assert_eq!(z.reconstruct().to_signed_vec(), vec![0, -600, -2]);
    assert_eq!(z.reconstruct(), Elementwise.apply(&xp, &yp)?);
    Ok(())
}
