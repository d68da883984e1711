use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::Result;
use crate::logging::DEFAULT_LOG_DIR;
use crate::tuner::constants::{
    DEFAULT_LIVES, DEFAULT_N_CALLS, DEFAULT_SCALE, DEFAULT_SEED, DEFAULT_ZSCORE, FLOOR_MARGIN,
    SKIP_PENALTY,
};
use crate::tuner::{ConstraintPolicy, SearchSpace, SizePolicy, TunerConfig};

/// Feasibility rule applied to every engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Memory estimate must stay within 90-110% of the baseline.
    MemoryBand,
    /// Result count must stay within 100-105% of the baseline.
    ResultFidelity,
}

/// Handling of window sizes that do not exceed the slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SizePolicyKind {
    /// Penalize the point without running the engine.
    Skip,
    /// Raise the size to slide + margin and run the engine.
    Floor,
}

/// Bayesian parameter tuner for a stream-processing engine.
#[derive(Parser, Debug)]
#[command(name = "tuner")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the engine executable
    #[arg(long)]
    pub binary: PathBuf,

    /// Baseline configuration file
    #[arg(long)]
    pub base_config: PathBuf,

    /// Number of evaluations after the baseline, seed points included
    #[arg(long, default_value_t = DEFAULT_N_CALLS)]
    pub n_calls: usize,

    /// Lower bound for the window-size scale factor
    #[arg(long, default_value_t = DEFAULT_SCALE.0)]
    pub min_scale: f64,

    /// Upper bound for the window-size scale factor
    #[arg(long, default_value_t = DEFAULT_SCALE.1)]
    pub max_scale: f64,

    /// Lower bound for zscore
    #[arg(long, default_value_t = DEFAULT_ZSCORE.0)]
    pub min_zscore: f64,

    /// Upper bound for zscore
    #[arg(long, default_value_t = DEFAULT_ZSCORE.1)]
    pub max_zscore: f64,

    /// Lower bound for lives
    #[arg(long, default_value_t = DEFAULT_LIVES.0)]
    pub min_lives: i64,

    /// Upper bound for lives
    #[arg(long, default_value_t = DEFAULT_LIVES.1)]
    pub max_lives: i64,

    /// Feasibility rule
    #[arg(long, value_enum, default_value_t = PolicyKind::MemoryBand)]
    pub policy: PolicyKind,

    /// What to do when the derived window size does not exceed the slide
    #[arg(long, value_enum, default_value_t = SizePolicyKind::Skip)]
    pub size_policy: SizePolicyKind,

    /// Headroom over the slide used by the floor size policy
    #[arg(long, default_value_t = FLOOR_MARGIN)]
    pub floor_margin: i64,

    /// Uniform random points evaluated after the seed points
    #[arg(long, default_value_t = 0)]
    pub initial_random: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Directory for timestamped run logs
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Write every evaluation to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write the best result to this JSON file
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Number of top results to display
    #[arg(long, default_value_t = 5)]
    pub topk: usize,
}

impl Args {
    /// Build the tuner configuration, validating the search bounds.
    pub fn tuner_config(&self) -> Result<TunerConfig> {
        let space = SearchSpace::new(
            (self.min_lives, self.max_lives),
            (self.min_scale, self.max_scale),
            (self.min_zscore, self.max_zscore),
        )?;

        let policy = match self.policy {
            PolicyKind::MemoryBand => ConstraintPolicy::memory_band(),
            PolicyKind::ResultFidelity => ConstraintPolicy::result_fidelity(),
        };

        let size_policy = match self.size_policy {
            SizePolicyKind::Skip => SizePolicy::Skip {
                penalty: SKIP_PENALTY,
            },
            SizePolicyKind::Floor => SizePolicy::Floor {
                margin: self.floor_margin,
            },
        };

        Ok(TunerConfig {
            base_config: self.base_config.clone(),
            n_calls: self.n_calls,
            space,
            size_policy,
            policy,
            initial_random: self.initial_random,
            seed: self.seed,
            ..TunerConfig::default()
        })
    }
}
