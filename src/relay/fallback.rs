use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

/// Picks one phrase from `pool`
///
/// With a seed the choice is deterministic; without one it comes from the
/// thread-local generator. An empty pool yields an empty string.
pub fn pick_fallback<'a>(pool: &[&'a str], seed: Option<u64>) -> &'a str {
    let picked = match seed {
        Some(seed) => pool.choose(&mut StdRng::seed_from_u64(seed)),
        None => pool.choose(&mut rand::rng()),
    };
    picked.copied().unwrap_or_default()
}
