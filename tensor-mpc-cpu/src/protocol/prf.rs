use rand::{rngs::OsRng, Rng, SeedableRng};

// ChaCha20 stream used as the PRG behind every sampler in the crate.
pub use rand_chacha::ChaCha20Rng as AesRng;

pub type PrfSeed = <AesRng as SeedableRng>::Seed;

/// Fresh seed drawn from the OS.
pub fn gen_seed() -> PrfSeed {
    OsRng.gen()
}

/// Expands a short integer into a full seed. Only meant for reproducible
/// experiments and tests.
pub fn seed_from_u64(seed: u64) -> PrfSeed {
    let mut out = PrfSeed::default();
    out[..8].copy_from_slice(&seed.to_le_bytes());
    out
}
