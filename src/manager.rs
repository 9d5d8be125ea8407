use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use anyhow::{Context, Result, bail};
use glob::glob;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Runs and analyzes the trials of a simulation directory.
///
/// The directory holds a `config.toml` file and one `run-NNNN` directory
/// per run, each with the config it was run with and one trajectory file
/// per trial.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Create a new run and perform all of its trials.
    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        self.save_run_config(run_idx).context("failed to save run config")?;

        let base_seed = self.cfg.init.seed.unwrap_or_else(rand::random);
        log::info!("base seed {base_seed}");

        let n_trials = self.cfg.output.n_trials;
        for trial_idx in 0..n_trials {
            let mut engine =
                Engine::generate_initial_condition(self.cfg.clone(), base_seed, trial_idx)
                    .context("failed to generate initial condition")?;

            engine
                .perform_trial(self.trajectory_file(run_idx, trial_idx))
                .with_context(|| format!("failed to perform trial {trial_idx}"))?;

            let progress = 100.0 * (trial_idx + 1) as f64 / n_trials as f64;
            log::info!("completed {progress:06.2}%");
        }

        Ok(())
    }

    /// Average the trials of every run.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let n_files = self
                .count_trajectory_files(run_idx)
                .context("failed to count trajectory files")?;
            if n_files == 0 {
                log::warn!("skipped {:?}: no trajectory files", self.run_dir(run_idx));
                continue;
            }

            let run_cfg_file = self.run_config_file(run_idx);
            let run_cfg = load_config(&run_cfg_file)
                .with_context(|| format!("failed to load {run_cfg_file:?}"))?;
            if run_cfg != self.cfg {
                bail!("run {run_idx} config differs from the current config");
            }

            let mut analyzer = Analyzer::new(&self.cfg);
            for file_idx in 0..n_files {
                analyzer
                    .add_file(self.trajectory_file(run_idx, file_idx))
                    .context("failed to add file")?;
            }

            analyzer
                .save_results(self.results_file(run_idx))
                .context("failed to save results")?;
        }

        Ok(())
    }

    /// Remove every run directory.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn count_trajectory_files(&self, run_idx: usize) -> Result<usize> {
        let pattern = self.run_dir(run_idx).join("trial-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob trajectory files")?
            .filter_map(Result::ok)
            .count();
        Ok(count)
    }

    fn trajectory_file(&self, run_idx: usize, trial_idx: usize) -> PathBuf {
        self.run_dir(run_idx)
            .join(format!("trial-{trial_idx:04}.msgpack"))
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }

    fn run_config_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("config.msgpack")
    }

    fn save_run_config(&self, run_idx: usize) -> Result<()> {
        let file = self.run_config_file(run_idx);
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self.cfg).context("failed to serialize config")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

fn load_config(file: &Path) -> Result<Config> {
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let cfg = decode::from_read(&mut reader).context("failed to deserialize config")?;
    Ok(cfg)
}
