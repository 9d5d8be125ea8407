use crate::config::Config;
use crate::patient::{Patient, TreatedPatient};
use crate::types::Record;
use crate::virus::Virus;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rmp_serde::encode;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Patient hosting the simulated population.
enum Host {
    Untreated(Patient),
    Treated(TreatedPatient),
}

impl Host {
    fn update(&mut self, rng: &mut ChaCha12Rng) -> usize {
        match self {
            Host::Untreated(patient) => patient.update(rng),
            Host::Treated(patient) => patient.update(rng),
        }
    }

    fn resistant_pop(&self, drugs: &[String]) -> usize {
        match self {
            Host::Untreated(_) => 0,
            Host::Treated(patient) => patient.count_resistant_to(drugs),
        }
    }
}

/// Simulation engine.
///
/// Runs a single trial: holds the configuration, the host patient and the
/// trial's random number generator.
pub struct Engine {
    cfg: Config,
    host: Host,
    tracked: Vec<String>,
    step: usize,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` for trial `trial_idx`.
    ///
    /// Every trial draws from its own stream of the generator seeded with
    /// `base_seed`, so trials are independent and reproducible.
    pub fn generate_initial_condition(
        cfg: Config,
        base_seed: u64,
        trial_idx: usize,
    ) -> Result<Self> {
        let model = &cfg.model;
        let virus = match &model.resistance {
            None => Virus::simple(model.max_birth_prob, model.clear_prob),
            Some(res) => Virus::resistant(
                model.max_birth_prob,
                model.clear_prob,
                res.traits.clone(),
                res.mut_prob,
            ),
        }
        .context("failed to create initial virus")?;
        let viruses = vec![virus; cfg.init.n_viruses];

        let host = match cfg.treatment {
            None => Host::Untreated(Patient::new(viruses, model.max_pop)?),
            Some(_) => Host::Treated(TreatedPatient::new(viruses, model.max_pop)?),
        };

        let mut rng = ChaCha12Rng::seed_from_u64(base_seed);
        rng.set_stream(trial_idx as u64);

        let tracked = cfg.tracked_drugs();

        Ok(Self {
            cfg,
            host,
            tracked,
            step: 0,
            rng,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Drugs administered so far.
    pub fn prescriptions(&self) -> &[String] {
        match &self.host {
            Host::Untreated(_) => &[],
            Host::Treated(patient) => patient.prescriptions(),
        }
    }

    /// Perform the trial and save one record per step to a binary file.
    pub fn perform_trial<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        for _ in 0..self.cfg.output.n_steps {
            let record = self.perform_step();
            encode::write(&mut writer, &record).context("failed to serialize record")?;
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Administer the drugs due at the current step, then update the host.
    pub fn perform_step(&mut self) -> Record {
        if let (Some(treatment), Host::Treated(patient)) = (&self.cfg.treatment, &mut self.host) {
            for prescription in &treatment.schedule {
                if prescription.step == self.step {
                    patient.add_prescription(&prescription.drug);
                    log::debug!("administered {} at step {}", prescription.drug, self.step);
                }
            }
        }

        let total_pop = self.host.update(&mut self.rng);
        self.step += 1;

        Record {
            step: self.step,
            total_pop,
            resistant_pop: self.host.resistant_pop(&self.tracked),
        }
    }
}
