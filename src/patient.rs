//! Virus populations hosted by a patient.
//!
//! [`Patient`] hosts an untreated population. [`TreatedPatient`] wraps a
//! patient together with the drugs administered to it; its particles must
//! resist every administered drug to reproduce.

use crate::error::SimError;
use crate::virus::{Reproduction, Virus};
use rand::Rng;
use std::num::NonZeroUsize;

/// Where admitted offspring go in the particle list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Append,
    AfterParent,
}

/// Untreated patient hosting a virus population.
#[derive(Debug, Clone)]
pub struct Patient {
    viruses: Vec<Virus>,
    max_pop: NonZeroUsize,
}

impl Patient {
    /// Create a patient hosting `viruses` with capacity `max_pop`.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidCapacity`] if `max_pop` is zero.
    pub fn new(viruses: Vec<Virus>, max_pop: usize) -> Result<Self, SimError> {
        let max_pop =
            NonZeroUsize::new(max_pop).ok_or(SimError::InvalidCapacity { value: max_pop })?;
        Ok(Self { viruses, max_pop })
    }

    pub fn viruses(&self) -> &[Virus] {
        &self.viruses
    }

    pub fn max_pop(&self) -> usize {
        self.max_pop.get()
    }

    pub fn total_pop(&self) -> usize {
        self.viruses.len()
    }

    /// Advance the population by one time step and return its new size.
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.step(&[], Placement::Append, rng)
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        active_drugs: &[String],
        placement: Placement,
        rng: &mut R,
    ) -> usize {
        // Density is fixed by the population at step entry.
        let pop_density = self.total_pop() as f64 / self.max_pop.get() as f64;

        let snapshot = std::mem::take(&mut self.viruses);
        let mut next = Vec::with_capacity(2 * snapshot.len());
        let mut appended = Vec::new();

        for mut virus in snapshot {
            let cleared = virus.clears(rng);

            // A cleared particle still attempts to reproduce, and the
            // offspring is admitted on a second, independent clearance draw.
            let offspring = match virus.reproduce(pop_density, active_drugs, rng) {
                Reproduction::Offspring(child) => (!virus.clears(rng)).then_some(child),
                Reproduction::NoOffspring(_) => None,
            };

            if !cleared {
                next.push(virus);
            }
            if let Some(child) = offspring {
                match placement {
                    Placement::Append => appended.push(child),
                    Placement::AfterParent => next.push(child),
                }
            }
        }

        next.append(&mut appended);
        self.viruses = next;

        log::trace!("density {pop_density:.4}, population {}", self.viruses.len());

        self.viruses.len()
    }
}

/// Patient receiving drug treatment.
#[derive(Debug, Clone)]
pub struct TreatedPatient {
    patient: Patient,
    prescriptions: Vec<String>,
}

impl TreatedPatient {
    /// Create a treated patient. No drug is administered initially.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidCapacity`] if `max_pop` is zero.
    pub fn new(viruses: Vec<Virus>, max_pop: usize) -> Result<Self, SimError> {
        Ok(Self {
            patient: Patient::new(viruses, max_pop)?,
            prescriptions: Vec::new(),
        })
    }

    pub fn viruses(&self) -> &[Virus] {
        self.patient.viruses()
    }

    pub fn max_pop(&self) -> usize {
        self.patient.max_pop()
    }

    pub fn total_pop(&self) -> usize {
        self.patient.total_pop()
    }

    /// Administer `drug` from the next step on. Already prescribed drugs are ignored.
    pub fn add_prescription(&mut self, drug: &str) {
        if !self.prescriptions.iter().any(|d| d == drug) {
            self.prescriptions.push(drug.to_string());
        }
    }

    /// Administered drugs, in the order they were prescribed.
    pub fn prescriptions(&self) -> &[String] {
        &self.prescriptions
    }

    /// Count particles resistant to every drug in `drugs`.
    ///
    /// An empty drug list counts no particle at all.
    pub fn count_resistant_to<S: AsRef<str>>(&self, drugs: &[S]) -> usize {
        if drugs.is_empty() {
            return 0;
        }
        self.viruses()
            .iter()
            .filter(|virus| drugs.iter().all(|drug| virus.is_resistant_to(drug.as_ref())))
            .count()
    }

    /// Advance the population by one time step under the current
    /// prescriptions and return its new size.
    ///
    /// Offspring are placed right after their parent.
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.patient
            .step(&self.prescriptions, Placement::AfterParent, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virus::tests::{FixedRng, ScriptedRng, UnusedRng, traits};
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn resistant(entries: &[(&str, bool)], mut_prob: f64) -> Virus {
        Virus::resistant(1.0, 0.0, traits(entries), mut_prob).unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            Patient::new(Vec::new(), 0).unwrap_err(),
            SimError::InvalidCapacity { value: 0 }
        );
        assert!(TreatedPatient::new(Vec::new(), 0).is_err());
    }

    #[test]
    fn empty_population_stays_empty() {
        let mut patient = Patient::new(Vec::new(), 10).unwrap();
        assert_eq!(patient.update(&mut UnusedRng), 0);
    }

    #[test]
    fn growth_stops_at_capacity() {
        let virus = Virus::simple(1.0, 0.0).unwrap();
        let mut patient = Patient::new(vec![virus], 2).unwrap();
        assert_eq!(patient.update(&mut FixedRng(0.25)), 2);

        // Density is now one: no further growth under any seed.
        for seed in 0..20 {
            let mut patient = patient.clone();
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            for _ in 0..50 {
                assert_eq!(patient.update(&mut rng), 2);
            }
        }
    }

    #[test]
    fn certain_clearance_empties_population() {
        let viruses = vec![Virus::simple(1.0, 1.0).unwrap(); 5];
        let mut patient = Patient::new(viruses, 100).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        assert_eq!(patient.update(&mut rng), 0);
        assert_eq!(patient.total_pop(), 0);
    }

    #[test]
    fn untreated_offspring_are_appended() {
        let viruses = vec![
            resistant(&[("a", true)], 0.0),
            resistant(&[("b", true)], 0.0),
        ];
        let mut patient = Patient::new(viruses, 100).unwrap();
        assert_eq!(patient.update(&mut FixedRng(0.25)), 4);
        let order: Vec<_> = patient
            .viruses()
            .iter()
            .map(|virus| virus.is_resistant_to("a"))
            .collect();
        assert_eq!(order, vec![true, false, true, false]);
    }

    #[test]
    fn treated_offspring_follow_parent() {
        let viruses = vec![
            resistant(&[("a", true)], 0.0),
            resistant(&[("b", true)], 0.0),
        ];
        let mut patient = TreatedPatient::new(viruses, 100).unwrap();
        assert_eq!(patient.update(&mut FixedRng(0.25)), 4);
        let order: Vec<_> = patient
            .viruses()
            .iter()
            .map(|virus| virus.is_resistant_to("a"))
            .collect();
        assert_eq!(order, vec![true, true, false, false]);
    }

    #[test]
    fn prescriptions_are_idempotent() {
        let mut patient = TreatedPatient::new(Vec::new(), 10).unwrap();
        assert!(patient.prescriptions().is_empty());
        patient.add_prescription("x");
        patient.add_prescription("x");
        assert_eq!(patient.prescriptions(), ["x"]);
        patient.add_prescription("y");
        patient.add_prescription("x");
        assert_eq!(patient.prescriptions(), ["x", "y"]);
    }

    #[test]
    fn empty_drug_list_counts_nothing() {
        let empty: [&str; 0] = [];
        let patient = TreatedPatient::new(Vec::new(), 10).unwrap();
        assert_eq!(patient.count_resistant_to(&empty), 0);

        let viruses = vec![resistant(&[("drugX", true)], 0.0); 3];
        let patient = TreatedPatient::new(viruses, 10).unwrap();
        assert_eq!(patient.count_resistant_to(&empty), 0);
        assert_eq!(patient.count_resistant_to(&["drugX"]), 3);
    }

    #[test]
    fn resistance_requires_every_drug() {
        let viruses = vec![
            resistant(&[("x", true), ("y", true)], 0.0),
            resistant(&[("x", true), ("y", false)], 0.0),
            resistant(&[("x", true)], 0.0),
            Virus::simple(1.0, 0.0).unwrap(),
        ];
        let patient = TreatedPatient::new(viruses, 10).unwrap();
        assert_eq!(patient.count_resistant_to(&["x"]), 3);
        assert_eq!(patient.count_resistant_to(&["x", "y"]), 1);
        assert_eq!(patient.count_resistant_to(&["z"]), 0);
    }

    #[test]
    fn drug_blocks_unresistant_lineage() {
        let viruses = vec![
            resistant(&[("drugX", false)], 0.0),
            resistant(&[("drugX", true)], 0.0),
        ];
        let mut patient = TreatedPatient::new(viruses, 1000).unwrap();
        patient.add_prescription("drugX");

        let mut rng = ChaCha12Rng::seed_from_u64(17);
        let mut prev_unresistant = 1;
        for _ in 0..20 {
            patient.update(&mut rng);
            let unresistant = patient.total_pop() - patient.count_resistant_to(&["drugX"]);
            assert!(unresistant <= prev_unresistant);
            prev_unresistant = unresistant;
        }
        assert_eq!(prev_unresistant, 1);
        assert!(patient.count_resistant_to(&["drugX"]) > 1);
    }

    #[test]
    fn prescription_applies_from_next_step() {
        let viruses = vec![resistant(&[("drugX", false)], 0.0)];
        let mut patient = TreatedPatient::new(viruses, 100).unwrap();
        assert_eq!(patient.update(&mut FixedRng(0.25)), 2);
        patient.add_prescription("drugX");
        for _ in 0..5 {
            assert_eq!(patient.update(&mut FixedRng(0.25)), 2);
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let make = || {
            let viruses = vec![resistant(&[("drugX", false), ("drugY", false)], 0.05); 10];
            TreatedPatient::new(viruses, 200).unwrap()
        };
        let run = |seed| {
            let mut patient = make();
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let mut counts = Vec::new();
            for step in 0..60 {
                if step == 30 {
                    patient.add_prescription("drugX");
                }
                counts.push((patient.update(&mut rng), patient.count_resistant_to(&["drugX"])));
            }
            counts
        };
        assert_eq!(run(23), run(23));
    }

    #[test]
    fn cleared_parent_offspring_can_be_admitted() {
        let virus = Virus::simple(1.0, 0.5).unwrap();
        let mut patient = Patient::new(vec![virus], 100).unwrap();
        // Clearance, birth, admission.
        let mut rng = ScriptedRng::new(&[0.25, 0.25, 0.75]);
        assert_eq!(patient.update(&mut rng), 1);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn surviving_parent_offspring_can_be_rejected() {
        let virus = Virus::simple(1.0, 0.5).unwrap();
        let mut patient = Patient::new(vec![virus], 100).unwrap();
        let mut rng = ScriptedRng::new(&[0.75, 0.25, 0.25]);
        assert_eq!(patient.update(&mut rng), 1);
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn failed_birth_skips_admission_draw() {
        let virus = Virus::simple(1.0, 0.5).unwrap();
        let mut patient = Patient::new(vec![virus], 100).unwrap();
        // Birth probability is 0.99 at density 0.01.
        let mut rng = ScriptedRng::new(&[0.75, 0.9921875, 0.0]);
        assert_eq!(patient.update(&mut rng), 1);
        assert_eq!(rng.remaining(), 1);
    }

    #[test]
    fn resistant_draws_follow_particle_order() {
        let virus =
            Virus::resistant(1.0, 0.5, traits(&[("b", false), ("a", false)]), 0.5).unwrap();
        let mut patient = TreatedPatient::new(vec![virus], 100).unwrap();
        // Clearance, mutation of "a", mutation of "b", birth, admission.
        let mut rng = ScriptedRng::new(&[0.75, 0.25, 0.75, 0.25, 0.75]);
        assert_eq!(patient.update(&mut rng), 2);
        assert_eq!(rng.remaining(), 0);
        assert_eq!(patient.count_resistant_to(&["a"]), 2);
        assert_eq!(patient.count_resistant_to(&["b"]), 0);
    }

    #[test]
    fn particles_draw_in_list_order() {
        let viruses = vec![
            Virus::resistant(1.0, 0.5, traits(&[("a", true)]), 0.0).unwrap(),
            Virus::resistant(1.0, 0.5, traits(&[("b", true)]), 0.0).unwrap(),
        ];
        let mut patient = Patient::new(viruses, 100).unwrap();
        // First particle: cleared, birth fails. Second: survives, offspring admitted.
        let mut rng = ScriptedRng::new(&[0.25, 0.75, 0.99, 0.75, 0.25, 0.25, 0.75]);
        assert_eq!(patient.update(&mut rng), 2);
        assert_eq!(rng.remaining(), 0);
        assert!(patient.viruses().iter().all(|virus| virus.is_resistant_to("b")));
    }
}
