use crate::utils::check_num;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// Virus model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Maximum reproduction probability of each particle.
    pub max_birth_prob: f64,
    /// Clearance probability of each particle.
    pub clear_prob: f64,
    /// Maximum virus population of the patient.
    pub max_pop: usize,

    /// Drug resistance of the initial particles (absent for simple viruses).
    pub resistance: Option<ResistanceConfig>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResistanceConfig {
    /// Probability of a resistance trait flipping at reproduction.
    pub mut_prob: f64,
    /// Initial resistance flag per drug.
    pub traits: BTreeMap<String, bool>,
}

/// Initial condition parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial number of virus particles.
    pub n_viruses: usize,
    /// Base seed of the trial random streams (random if absent).
    pub seed: Option<u64>,
}

/// Drug administration schedule.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TreatmentConfig {
    /// Drugs administered during the trial.
    pub schedule: Vec<Prescription>,
    /// Drugs whose joint resistance is recorded (defaults to the scheduled drugs).
    pub tracked: Option<Vec<String>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Prescription {
    /// Number of completed steps after which the drug is administered.
    pub step: usize,
    /// Name of the drug.
    pub drug: String,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of steps per trial.
    pub n_steps: usize,
    /// Number of independent trials per run.
    pub n_trials: usize,
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub init: InitConfig,
    /// Treatment of the patient (absent for untreated patients).
    pub treatment: Option<TreatmentConfig>,
    pub output: OutputConfig,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        contents.parse()
    }

    /// Drugs whose joint resistance is recorded at every step.
    pub fn tracked_drugs(&self) -> Vec<String> {
        let Some(treatment) = &self.treatment else {
            return Vec::new();
        };
        if let Some(tracked) = &treatment.tracked {
            return tracked.clone();
        }
        let mut drugs: Vec<String> = Vec::new();
        for prescription in &treatment.schedule {
            if !drugs.contains(&prescription.drug) {
                drugs.push(prescription.drug.clone());
            }
        }
        drugs
    }

    fn validate(&self) -> Result<()> {
        check_num(self.model.max_birth_prob, 0.0..=1.0)
            .context("invalid maximum birth probability")?;
        check_num(self.model.clear_prob, 0.0..=1.0).context("invalid clearance probability")?;
        check_num(self.model.max_pop, 1..10_000_000).context("invalid maximum population")?;
        if let Some(resistance) = &self.model.resistance {
            check_num(resistance.mut_prob, 0.0..=1.0).context("invalid mutation probability")?;
            check_drugs(resistance.traits.keys()).context("invalid resistance traits")?;
        }

        check_num(self.init.n_viruses, 0..10_000_000)
            .context("invalid initial number of viruses")?;

        check_num(self.output.n_steps, 1..100_000).context("invalid number of steps")?;
        check_num(self.output.n_trials, 1..10_000).context("invalid number of trials")?;

        if let Some(treatment) = &self.treatment {
            for (i_presc, prescription) in treatment.schedule.iter().enumerate() {
                check_num(prescription.step, 0..self.output.n_steps)
                    .with_context(|| format!("invalid step of prescription {i_presc}"))?;
            }
            check_drugs(treatment.schedule.iter().map(|presc| &presc.drug))
                .context("invalid drug schedule")?;
            if let Some(tracked) = &treatment.tracked {
                check_drugs(tracked).context("invalid tracked drugs")?;
            }
        }

        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }
}

fn check_drugs<'a, I>(drugs: I) -> Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    if drugs.into_iter().any(|drug| drug.trim().is_empty()) {
        bail!("drug names must not be empty");
    }
    Ok(())
}
