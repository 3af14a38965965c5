//! Mutation: perturb a network's parameters in place.
//!
//! Every parameter is considered independently; with probability `chance` it receives
//! an additive perturbation drawn from the strategy's distribution.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{Error, Network, Result};

/// Population fitness std-dev below which adaptive mutation widens its step.
pub const LOW_DIVERSITY: f64 = 0.05;
/// Population fitness std-dev above which adaptive mutation narrows its step.
pub const HIGH_DIVERSITY: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mutation {
    /// Add a uniform value in `[-rate, rate]`.
    Uniform,
    /// Add `N(0, std_dev)`; the mutation rate is not used.
    Gaussian { std_dev: f64 },
    /// Uniform with a rate that shrinks linearly to zero over the run.
    NonUniform,
    /// Uniform with a rate scaled by population diversity.
    Adaptive,
}

impl Default for Mutation {
    fn default() -> Self {
        Mutation::Gaussian { std_dev: 0.1 }
    }
}

/// Per-call inputs to a mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationContext {
    pub rate: f64,
    pub chance: f64,
    /// 0-based generation index.
    pub generation: usize,
    pub max_generations: usize,
    /// Standard deviation of the current population's fitness.
    pub fitness_std_dev: f64,
}

impl MutationContext {
    pub fn new(rate: f64, chance: f64) -> Self {
        Self {
            rate,
            chance,
            generation: 0,
            max_generations: 0,
            fitness_std_dev: 0.0,
        }
    }
}

impl Mutation {
    pub fn validate(self) -> Result<()> {
        if let Mutation::Gaussian { std_dev } = self {
            if !(std_dev.is_finite() && std_dev >= 0.0) {
                return Err(Error::InvalidParam(format!(
                    "gaussian std_dev must be finite and >= 0, got {std_dev}"
                )));
            }
        }
        Ok(())
    }

    /// Rate actually used for the uniform-style strategies.
    pub fn effective_rate(self, ctx: &MutationContext) -> f64 {
        match self {
            Mutation::Uniform | Mutation::Gaussian { .. } => ctx.rate,
            Mutation::NonUniform => {
                if ctx.max_generations == 0 {
                    ctx.rate
                } else {
                    let progress =
                        (ctx.generation as f64 / ctx.max_generations as f64).clamp(0.0, 1.0);
                    ctx.rate * (1.0 - progress)
                }
            }
            Mutation::Adaptive => {
                if ctx.fitness_std_dev < LOW_DIVERSITY {
                    ctx.rate * 1.5
                } else if ctx.fitness_std_dev > HIGH_DIVERSITY {
                    ctx.rate * 0.75
                } else {
                    ctx.rate
                }
            }
        }
    }

    pub fn apply<R: Rng + ?Sized>(
        self,
        net: &mut Network,
        ctx: &MutationContext,
        rng: &mut R,
    ) -> Result<()> {
        if !(ctx.chance.is_finite() && (0.0..=1.0).contains(&ctx.chance)) {
            return Err(Error::InvalidParam(format!(
                "mutation chance must be in [0,1], got {}",
                ctx.chance
            )));
        }

        match self {
            Mutation::Gaussian { std_dev } => {
                let normal = Normal::new(0.0, std_dev).map_err(|e| {
                    Error::InvalidParam(format!("gaussian std_dev {std_dev}: {e}"))
                })?;
                for p in net.params_mut() {
                    if rng.gen::<f64>() < ctx.chance {
                        *p += normal.sample(rng);
                    }
                }
            }
            Mutation::Uniform | Mutation::NonUniform | Mutation::Adaptive => {
                let rate = self.effective_rate(ctx);
                if !rate.is_finite() {
                    return Err(Error::InvalidParam(format!(
                        "mutation rate must be finite, got {rate}"
                    )));
                }
                for p in net.params_mut() {
                    if rng.gen::<f64>() < ctx.chance {
                        *p += (rng.gen::<f64>() - 0.5) * 2.0 * rate;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::Activation;

    fn zero_net() -> Network {
        Network::new(&[4, 5, 3], Activation::ReLU, Activation::Sigmoid).unwrap()
    }

    #[test]
    fn zero_chance_leaves_network_untouched() {
        let mut rng = StdRng::seed_from_u64(0);
        for m in [
            Mutation::Uniform,
            Mutation::Gaussian { std_dev: 1.0 },
            Mutation::NonUniform,
            Mutation::Adaptive,
        ] {
            let mut net = zero_net();
            m.apply(&mut net, &MutationContext::new(0.5, 0.0), &mut rng)
                .unwrap();
            assert!(net.params().all(|p| p == 0.0), "{m:?}");
        }
    }

    #[test]
    fn uniform_perturbations_stay_within_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = zero_net();
        Mutation::Uniform
            .apply(&mut net, &MutationContext::new(0.3, 1.0), &mut rng)
            .unwrap();
        assert!(net.params().all(|p| p.abs() <= 0.3));
        assert!(net.params().any(|p| p != 0.0));
    }

    #[test]
    fn gaussian_ignores_rate_and_perturbs() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut net = zero_net();
        Mutation::Gaussian { std_dev: 0.1 }
            .apply(&mut net, &MutationContext::new(0.0, 1.0), &mut rng)
            .unwrap();
        assert!(net.params().all(|p| p != 0.0));
        // 0.1 std-dev: nothing near 10 sigma.
        assert!(net.params().all(|p| p.abs() < 1.0));
    }

    #[test]
    fn gaussian_rejects_bad_std_dev() {
        assert!(Mutation::Gaussian { std_dev: -1.0 }.validate().is_err());
        let mut net = zero_net();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(Mutation::Gaussian { std_dev: f64::NAN }
            .apply(&mut net, &MutationContext::new(0.1, 0.5), &mut rng)
            .is_err());
    }

    #[test]
    fn non_uniform_rate_shrinks_to_zero() {
        let mut ctx = MutationContext::new(0.4, 1.0);
        ctx.max_generations = 4;

        ctx.generation = 0;
        assert!((Mutation::NonUniform.effective_rate(&ctx) - 0.4).abs() < 1e-12);
        ctx.generation = 2;
        assert!((Mutation::NonUniform.effective_rate(&ctx) - 0.2).abs() < 1e-12);
        ctx.generation = 4;
        assert_eq!(Mutation::NonUniform.effective_rate(&ctx), 0.0);

        let mut net = zero_net();
        let mut rng = StdRng::seed_from_u64(4);
        Mutation::NonUniform.apply(&mut net, &ctx, &mut rng).unwrap();
        assert!(net.params().all(|p| p == 0.0));
    }

    #[test]
    fn adaptive_rate_follows_diversity() {
        let mut ctx = MutationContext::new(0.2, 1.0);

        ctx.fitness_std_dev = 0.01;
        assert!((Mutation::Adaptive.effective_rate(&ctx) - 0.3).abs() < 1e-12);
        ctx.fitness_std_dev = 0.1;
        assert!((Mutation::Adaptive.effective_rate(&ctx) - 0.2).abs() < 1e-12);
        ctx.fitness_std_dev = 0.5;
        assert!((Mutation::Adaptive.effective_rate(&ctx) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn same_seed_same_mutation() {
        let base = Network::new_with_seed(&[3, 3], Activation::ReLU, Activation::Sigmoid, 9).unwrap();
        let ctx = MutationContext::new(0.1, 0.5);

        let mut a = base.clone();
        let mut b = base.clone();
        Mutation::Uniform
            .apply(&mut a, &ctx, &mut StdRng::seed_from_u64(10))
            .unwrap();
        Mutation::Uniform
            .apply(&mut b, &ctx, &mut StdRng::seed_from_u64(10))
            .unwrap();
        assert!(a.params().eq(b.params()));
        assert!(!a.params().eq(base.params()));
    }
}
