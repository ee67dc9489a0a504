//! Deterministic seeding for independent runs.

/// Counter-based seed derivation using SplitMix64.
///
/// Gives each pixel of a batch its own well-mixed seed while keeping the
/// batch reproducible from a single base seed.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
