//! Sampling parameters and seeded index selection.

use std::{collections::BTreeSet, fmt};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ResultsError;

/// How many hits a sample keeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleAmount {
    /// An absolute number of hits.
    Count(usize),
    /// A fraction of the population, between 0 and 1.
    Fraction(f64),
}

/// A reproducible sampling request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleParameters {
    /// Seed of the pseudo-random generator.
    pub seed: i64,
    /// Sample size.
    pub amount: SampleAmount,
}

impl SampleParameters {
    /// Keeps `count` hits.
    pub fn count(count: usize, seed: i64) -> Self {
        Self {
            seed,
            amount: SampleAmount::Count(count),
        }
    }

    /// Keeps a fraction of the hits.
    pub fn fraction(fraction: f64, seed: i64) -> Self {
        Self {
            seed,
            amount: SampleAmount::Fraction(fraction),
        }
    }

    /// Draws a seed so the sample is reproducible from these parameters later on.
    pub fn with_random_seed(amount: SampleAmount) -> Self {
        Self {
            seed: rand::random(),
            amount,
        }
    }

    /// Number of hits to keep out of `population`.
    pub fn sample_size(&self, population: usize) -> Result<usize, ResultsError> {
        match self.amount {
            SampleAmount::Count(count) => Ok(count.min(population)),
            SampleAmount::Fraction(f) if (0.0..=1.0).contains(&f) => {
                Ok(((f * population as f64).round() as usize).min(population))
            }
            SampleAmount::Fraction(f) => Err(ResultsError::invalid(format!(
                "sample fraction {f} is not between 0 and 1"
            ))),
        }
    }
}

impl fmt::Display for SampleParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.amount {
            SampleAmount::Count(n) => write!(f, "count={n},seed={}", self.seed),
            SampleAmount::Fraction(x) => write!(f, "fraction={x},seed={}", self.seed),
        }
    }
}

/// Picks `count` distinct indices from `0..population`, returned ascending.
///
/// Indices are drawn with rejection of repeats; only the resulting set matters.
pub(crate) fn choose_indices(population: usize, count: usize, seed: i64) -> Vec<usize> {
    if count >= population {
        return (0..population).collect();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    let mut chosen = BTreeSet::new();
    while chosen.len() < count {
        chosen.insert(rng.random_range(0..population));
    }
    chosen.into_iter().collect()
}
