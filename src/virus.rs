//! Virus particles.
//!
//! A particle carries a clearance probability and a maximum birth
//! probability. Resistant particles additionally carry a [`Resistance`]
//! record: a per-drug resistance flag and a mutation probability.

use crate::error::SimError;
use crate::utils::check_prob;
use rand::Rng;
use std::collections::BTreeMap;

/// Drug resistance record of a resistant particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistance {
    traits: BTreeMap<String, bool>,
    mut_prob: f64,
}

impl Resistance {
    /// Resistance flag per drug. Drugs missing from the map are not resisted.
    pub fn traits(&self) -> &BTreeMap<String, bool> {
        &self.traits
    }

    pub fn mut_prob(&self) -> f64 {
        self.mut_prob
    }

    fn resists(&self, drug: &str) -> bool {
        self.traits.get(drug).copied().unwrap_or(false)
    }

    /// Flip every trait independently with probability `mut_prob`.
    fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for resistant in self.traits.values_mut() {
            if rng.random::<f64>() <= self.mut_prob {
                *resistant = !*resistant;
            }
        }
    }
}

/// Why a reproduction attempt produced no offspring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOffspring {
    /// An active drug is not resisted; no randomness was consumed.
    DrugSuppressed,
    /// The effective birth probability is zero; no randomness was consumed.
    Saturated,
    /// The birth draw failed.
    BirthFailed,
}

/// Outcome of [`Virus::reproduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reproduction {
    Offspring(Virus),
    NoOffspring(NoOffspring),
}

/// A single virus particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Virus {
    max_birth_prob: f64,
    clear_prob: f64,
    resistance: Option<Resistance>,
}

impl Virus {
    /// Create a particle without drug resistance.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidProbability`] if either probability lies
    /// outside `[0, 1]`.
    pub fn simple(max_birth_prob: f64, clear_prob: f64) -> Result<Self, SimError> {
        Ok(Self {
            max_birth_prob: check_prob("max_birth_prob", max_birth_prob)?,
            clear_prob: check_prob("clear_prob", clear_prob)?,
            resistance: None,
        })
    }

    /// Create a particle carrying a resistance record.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidProbability`] if any probability lies
    /// outside `[0, 1]`.
    pub fn resistant(
        max_birth_prob: f64,
        clear_prob: f64,
        traits: BTreeMap<String, bool>,
        mut_prob: f64,
    ) -> Result<Self, SimError> {
        let mut virus = Self::simple(max_birth_prob, clear_prob)?;
        virus.resistance = Some(Resistance {
            traits,
            mut_prob: check_prob("mut_prob", mut_prob)?,
        });
        Ok(virus)
    }

    pub fn max_birth_prob(&self) -> f64 {
        self.max_birth_prob
    }

    pub fn clear_prob(&self) -> f64 {
        self.clear_prob
    }

    pub fn resistance(&self) -> Option<&Resistance> {
        self.resistance.as_ref()
    }

    /// Mutation probability, zero for particles without a resistance record.
    pub fn mut_prob(&self) -> f64 {
        self.resistance.as_ref().map_or(0.0, Resistance::mut_prob)
    }

    /// Whether this particle survives `drug`.
    pub fn is_resistant_to(&self, drug: &str) -> bool {
        self.resistance.as_ref().is_some_and(|res| res.resists(drug))
    }

    /// Draw whether this particle is cleared at the current step.
    pub fn clears<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random::<f64>() <= self.clear_prob
    }

    /// Attempt to reproduce at the given population density.
    ///
    /// A particle reproduces only if it resists every drug in `active_drugs`,
    /// and then with probability `max_birth_prob * (1 - pop_density)`. Before
    /// the birth draw a resistant particle mutates its own resistance record;
    /// the offspring inherits the mutated record.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        pop_density: f64,
        active_drugs: &[String],
        rng: &mut R,
    ) -> Reproduction {
        if !active_drugs.iter().all(|drug| self.is_resistant_to(drug)) {
            return Reproduction::NoOffspring(NoOffspring::DrugSuppressed);
        }

        let birth_prob = self.max_birth_prob * (1.0 - pop_density);
        if birth_prob == 0.0 {
            return Reproduction::NoOffspring(NoOffspring::Saturated);
        }

        if let Some(resistance) = &mut self.resistance {
            resistance.mutate(rng);
        }

        if rng.random::<f64>() <= birth_prob {
            Reproduction::Offspring(self.clone())
        } else {
            Reproduction::NoOffspring(NoOffspring::BirthFailed)
        }
    }
}
