use crate::{
    config::SpinConfig,
    rng::{ProvablyFairRng, RandomSource},
    symbols::Symbol,
};

/// Picks the face a spin lands on. Draws exactly one value from `rng`.
pub fn select_outcome(config: &SpinConfig, rng: &mut dyn RandomSource) -> Symbol {
    let r = rng.next_f64();
    match &config.weights {
        Some(weights) => {
            let entries = weights.entries();
            let mut cumulative = 0.0;
            for (symbol, p) in entries {
                cumulative += p;
                if cumulative >= r {
                    return *symbol;
                }
            }
            // floating drift left the sum just short of r
            entries.last().map(|(s, _)| *s).unwrap_or(Symbol::Shin)
        }
        None => {
            let idx = ((r * Symbol::ALL.len() as f64).floor() as usize).min(Symbol::ALL.len() - 1);
            Symbol::ALL[idx]
        }
    }
}

/// Convenience: select an outcome creating the RNG from seeds.
pub fn spin_with_seeds(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &SpinConfig,
) -> Symbol {
    let mut rng = ProvablyFairRng::new(server_seed, client_seed, nonce);
    select_outcome(config, &mut rng)
}

/// Verify that a published symbol matches what the seeds produce.
pub fn verify_spin(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    config: &SpinConfig,
    expected: Symbol,
) -> bool {
    spin_with_seeds(server_seed, client_seed, nonce, config) == expected
}
