use crate::config::Config;
use crate::stats::{Accumulator, AccumulatorReport};
use crate::types::Record;
use anyhow::{Context, Result, bail};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

/// Statistics across trials at a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: usize,
    pub total_pop: AccumulatorReport,
    pub resistant_pop: AccumulatorReport,
}

/// Averages trial trajectories step by step.
pub struct Analyzer {
    total_pop: Vec<Accumulator>,
    resistant_pop: Vec<Accumulator>,
}

impl Analyzer {
    pub fn new(cfg: &Config) -> Self {
        let n_steps = cfg.output.n_steps;
        Self {
            total_pop: vec![Accumulator::new(); n_steps],
            resistant_pop: vec![Accumulator::new(); n_steps],
        }
    }

    /// Number of trials added so far.
    pub fn n_trials(&self) -> usize {
        self.total_pop.first().map_or(0, Accumulator::n_vals)
    }

    /// Add the trajectory of one trial.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for i_step in 0..self.total_pop.len() {
            let record: Record =
                decode::from_read(&mut reader).context("failed to deserialize record")?;
            if record.step != i_step + 1 {
                let exp_step = i_step + 1;
                bail!("expected record of step {exp_step}, but got step {}", record.step);
            }
            self.total_pop[i_step].add(record.total_pop as f64);
            self.resistant_pop[i_step].add(record.resistant_pop as f64);
        }

        let trailing = reader.fill_buf().context("failed to read trailing bytes")?;
        if !trailing.is_empty() {
            bail!("file holds more than {} records", self.total_pop.len());
        }

        Ok(())
    }

    pub fn reports(&self) -> Vec<StepReport> {
        self.total_pop
            .iter()
            .zip(&self.resistant_pop)
            .enumerate()
            .map(|(i_step, (total_pop, resistant_pop))| StepReport {
                step: i_step + 1,
                total_pop: total_pop.report(),
                resistant_pop: resistant_pop.report(),
            })
            .collect()
    }

    /// Save the step reports to a binary file.
    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let reports = self.reports();
        encode::write(&mut writer, &reports).context("failed to serialize reports")?;

        if let Some(last) = reports.last() {
            log::info!(
                "step {}: total_pop {:.2}, resistant_pop {:.2} ({} trials)",
                last.step,
                last.total_pop.mean,
                last.resistant_pop.mean,
                self.n_trials()
            );
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Load step reports saved by [`Analyzer::save_results`].
    pub fn load_results<P: AsRef<Path>>(file: P) -> Result<Vec<StepReport>> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let reports = decode::from_read(&mut reader).context("failed to deserialize reports")?;
        Ok(reports)
    }
}
