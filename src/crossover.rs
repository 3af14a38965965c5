//! Crossover: combine two parents into a freshly allocated child.
//!
//! Parameters are addressed in flattened order: for each layer, the weights row-major,
//! then the biases. Children take architecture and activations from the first parent and
//! start without optimizer state.

use rand::Rng;

use crate::{Error, Network, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Crossover {
    /// Each parameter from either parent with probability 1/2.
    #[default]
    Uniform,
    /// Parent 1 before a random cut, parent 2 from the cut on.
    SinglePoint,
    /// Parent 2 between two ordered cuts, parent 1 outside.
    TwoPoint,
    /// `alpha * p1 + (1 - alpha) * p2` with one `alpha` in `[0, 1)` per child.
    Arithmetic,
}

impl Crossover {
    pub fn apply<R: Rng + ?Sized>(
        self,
        parent1: &Network,
        parent2: &Network,
        rng: &mut R,
    ) -> Result<Network> {
        if parent1.architecture() != parent2.architecture() {
            return Err(Error::InvalidDimensions(format!(
                "cannot cross {:?} with {:?}",
                parent1.architecture(),
                parent2.architecture()
            )));
        }

        let mut child = Network::new(
            parent1.architecture(),
            parent1.hidden_activation(),
            parent1.output_activation(),
        )?;
        let total = parent1.num_params();

        match self {
            Crossover::Uniform => {
                fill(&mut child, parent1, parent2, |_, a, b| {
                    if rng.gen_bool(0.5) {
                        a
                    } else {
                        b
                    }
                });
            }
            Crossover::SinglePoint => {
                let cut = rng.gen_range(0..total);
                fill(&mut child, parent1, parent2, |i, a, b| {
                    if i < cut {
                        a
                    } else {
                        b
                    }
                });
            }
            Crossover::TwoPoint => {
                let (lo, hi) = two_cuts(total, rng);
                fill(&mut child, parent1, parent2, |i, a, b| {
                    if (lo..hi).contains(&i) {
                        b
                    } else {
                        a
                    }
                });
            }
            Crossover::Arithmetic => {
                let alpha: f64 = rng.gen();
                fill(&mut child, parent1, parent2, |_, a, b| {
                    alpha * a + (1.0 - alpha) * b
                });
            }
        }
        Ok(child)
    }
}

/// Two independent cut indices in `0..total`, returned in ascending order.
pub fn two_cuts<R: Rng + ?Sized>(total: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..total);
    let b = rng.gen_range(0..total);
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

fn fill<F>(child: &mut Network, p1: &Network, p2: &Network, mut pick: F)
where
    F: FnMut(usize, f64, f64) -> f64,
{
    let parents = p1.params().zip(p2.params());
    for (i, (dst, (a, b))) in child.params_mut().zip(parents).enumerate() {
        *dst = pick(i, a, b);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::{Activation, ErrorCode};

    fn parents() -> (Network, Network) {
        let arch = [3, 4, 2];
        let mut p1 = Network::new(&arch, Activation::ReLU, Activation::Sigmoid).unwrap();
        let mut p2 = Network::new(&arch, Activation::ReLU, Activation::Sigmoid).unwrap();
        // Distinct, easily recognizable values: p1 = +i, p2 = -i - 1.
        for (i, p) in p1.params_mut().enumerate() {
            *p = i as f64;
        }
        for (i, p) in p2.params_mut().enumerate() {
            *p = -(i as f64) - 1.0;
        }
        (p1, p2)
    }

    #[test]
    fn uniform_child_takes_each_value_from_a_parent() {
        let (p1, p2) = parents();
        let mut rng = StdRng::seed_from_u64(0);
        let child = Crossover::Uniform.apply(&p1, &p2, &mut rng).unwrap();

        let mut from_p1 = 0;
        for ((c, a), b) in child.params().zip(p1.params()).zip(p2.params()) {
            assert!(c == a || c == b);
            if c == a {
                from_p1 += 1;
            }
        }
        assert!(from_p1 > 0 && from_p1 < child.num_params());
        assert!(child.optimizer_state().is_none());
    }

    #[test]
    fn single_point_cut_is_determined_by_the_seed() {
        let (p1, p2) = parents();
        let total = p1.num_params();

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let cut = rng.clone().gen_range(0..total);
            let child = Crossover::SinglePoint.apply(&p1, &p2, &mut rng).unwrap();

            for (i, ((c, a), b)) in child.params().zip(p1.params()).zip(p2.params()).enumerate() {
                let want = if i < cut { a } else { b };
                assert_eq!(c, want, "seed {seed} index {i} cut {cut}");
            }
        }
    }

    #[test]
    fn two_point_middle_segment_comes_from_second_parent() {
        let (p1, p2) = parents();
        let total = p1.num_params();

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (lo, hi) = two_cuts(total, &mut rng.clone());
            assert!(lo <= hi);
            let child = Crossover::TwoPoint.apply(&p1, &p2, &mut rng).unwrap();

            for (i, ((c, a), b)) in child.params().zip(p1.params()).zip(p2.params()).enumerate() {
                let want = if i >= lo && i < hi { b } else { a };
                assert_eq!(c, want, "seed {seed} index {i} cuts {lo}..{hi}");
            }
        }
    }

    #[test]
    fn arithmetic_child_lies_between_parents() {
        let (p1, p2) = parents();
        let mut rng = StdRng::seed_from_u64(5);
        let child = Crossover::Arithmetic.apply(&p1, &p2, &mut rng).unwrap();

        for ((c, a), b) in child.params().zip(p1.params()).zip(p2.params()) {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            assert!(c >= lo - 1e-12 && c <= hi + 1e-12);
        }
    }

    #[test]
    fn mismatched_parents_are_rejected() {
        let p1 = Network::new(&[2, 3], Activation::ReLU, Activation::Sigmoid).unwrap();
        let p2 = Network::new(&[2, 3, 1], Activation::ReLU, Activation::Sigmoid).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for op in [
            Crossover::Uniform,
            Crossover::SinglePoint,
            Crossover::TwoPoint,
            Crossover::Arithmetic,
        ] {
            let err = op.apply(&p1, &p2, &mut rng).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidDimensions);
        }
    }
}
