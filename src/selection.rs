//! Selection: choose a breeding pool from a fitness-ranked population.
//!
//! Every strategy returns a pool of `max(1, population / 2)` entries. Entries borrow
//! the networks they describe; the pool lives for one generation.

use std::cmp::Ordering;

use rand::Rng;

use crate::{Error, Network, Result};

/// A network paired with its fitness (accuracy in `[0, 1]`).
#[derive(Debug, Clone, Copy)]
pub struct NetworkFitness<'a> {
    pub network: &'a Network,
    pub fitness: f64,
}

impl<'a> NetworkFitness<'a> {
    pub fn new(network: &'a Network, fitness: f64) -> Self {
        Self { network, fitness }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selection {
    /// Top half by fitness.
    Elitism,
    /// Best of `tournament_size` uniform draws (with replacement), repeated.
    #[default]
    Tournament,
    /// Draw proportional to fitness.
    RouletteWheel,
    /// Draw proportional to rank weight `population - rank`.
    Rank,
}

/// Sort descending by fitness. The sort is stable, so equal fitness keeps input order.
pub fn sort_by_fitness_desc(population: &mut [NetworkFitness<'_>]) {
    population.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));
}

/// Pool size for a population of `n`.
#[inline]
pub fn pool_size(n: usize) -> usize {
    (n / 2).max(1)
}

/// Index of the winner of one tournament of `size` uniform draws with replacement.
/// Only a strictly fitter competitor replaces the current leader.
pub fn tournament_pick<R: Rng + ?Sized>(
    population: &[NetworkFitness<'_>],
    size: usize,
    rng: &mut R,
) -> Result<usize> {
    if population.is_empty() {
        return Err(Error::InvalidParam(
            "cannot run a tournament on an empty population".to_owned(),
        ));
    }
    if size == 0 {
        return Err(Error::InvalidParam("tournament_size must be > 0".to_owned()));
    }

    let mut best = rng.gen_range(0..population.len());
    for _ in 1..size {
        let idx = rng.gen_range(0..population.len());
        if population[idx].fitness > population[best].fitness {
            best = idx;
        }
    }
    Ok(best)
}

/// Walk cumulative `weights` until it reaches `slice`; rounding past the end picks the last.
fn spin_wheel<I: Iterator<Item = f64>>(weights: I, slice: f64, len: usize) -> usize {
    let mut acc = 0.0;
    for (i, w) in weights.enumerate() {
        acc += w;
        if acc >= slice {
            return i;
        }
    }
    len - 1
}

impl Selection {
    /// Select a breeding pool.
    ///
    /// `Elitism` and `Rank` sort `population` in place (descending fitness).
    pub fn select<'a, R: Rng + ?Sized>(
        self,
        population: &mut [NetworkFitness<'a>],
        tournament_size: usize,
        rng: &mut R,
    ) -> Result<Vec<NetworkFitness<'a>>> {
        let n = population.len();
        if n == 0 {
            return Err(Error::InvalidParam(
                "cannot select from an empty population".to_owned(),
            ));
        }
        let k = pool_size(n);

        let pool = match self {
            Selection::Elitism => {
                sort_by_fitness_desc(population);
                population[..k].to_vec()
            }
            Selection::Tournament => {
                let mut pool = Vec::with_capacity(k);
                for _ in 0..k {
                    let idx = tournament_pick(population, tournament_size, rng)?;
                    pool.push(population[idx]);
                }
                pool
            }
            Selection::RouletteWheel => {
                let total: f64 = population.iter().map(|nf| nf.fitness).sum();
                let mut pool = Vec::with_capacity(k);
                for _ in 0..k {
                    let idx = if total > 0.0 {
                        let slice = rng.gen::<f64>() * total;
                        spin_wheel(population.iter().map(|nf| nf.fitness), slice, n)
                    } else {
                        // No fitness mass: every individual is equally likely.
                        rng.gen_range(0..n)
                    };
                    pool.push(population[idx]);
                }
                pool
            }
            Selection::Rank => {
                sort_by_fitness_desc(population);
                let total = (n * (n + 1) / 2) as f64;
                let mut pool = Vec::with_capacity(k);
                for _ in 0..k {
                    let slice = rng.gen::<f64>() * total;
                    let idx = spin_wheel((0..n).map(|j| (n - j) as f64), slice, n);
                    pool.push(population[idx]);
                }
                pool
            }
        };
        Ok(pool)
    }
}
