use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::load_config;
use crate::error::Result;
use crate::logging::RunLogger;
use crate::tuner::constants::{DEFAULT_N_CALLS, DEFAULT_SEED, SEED_POINTS};
use crate::tuner::engine::{EnginePort, InterruptFlag};
use crate::tuner::evaluation::{BaselineRecord, EvaluationResult, Evaluator};
use crate::tuner::policy::ConstraintPolicy;
use crate::tuner::space::{derive_size, SearchPoint, SearchSpace, SizePolicy};
use crate::tuner::surrogate::Proposer;

/// Configuration for the tuner.
#[derive(Debug, Clone)]
pub struct TunerConfig {
    pub base_config: PathBuf,
    /// Evaluations after the baseline, seeds included.
    pub n_calls: usize,
    pub space: SearchSpace,
    pub size_policy: SizePolicy,
    pub policy: ConstraintPolicy,
    /// Hand-picked points evaluated before any model-driven proposal.
    pub seed_points: Vec<SearchPoint>,
    /// Uniform random points evaluated after the seeds.
    pub initial_random: usize,
    pub seed: u64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            base_config: PathBuf::from("config.txt"),
            n_calls: DEFAULT_N_CALLS,
            space: SearchSpace::default(),
            size_policy: SizePolicy::default(),
            policy: ConstraintPolicy::default(),
            seed_points: SEED_POINTS
                .iter()
                .map(|&(lives, scale, zscore)| SearchPoint::new(lives, scale, zscore))
                .collect(),
            initial_random: 0,
            seed: DEFAULT_SEED,
        }
    }
}

/// Optimizer lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Seeding,
    Searching,
    Done,
}

/// Results from a tuning run.
#[derive(Debug, Clone)]
pub struct TunerResults {
    pub baseline: BaselineRecord,
    /// Every evaluation in proposal order.
    pub history: Vec<EvaluationResult>,
    /// Base window size the tuned sizes were derived from.
    pub base_size: f64,
}

impl TunerResults {
    /// Lowest score; the earliest evaluation wins ties.
    pub fn best(&self) -> Option<&EvaluationResult> {
        self.history
            .iter()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// `(base_size / lives) * scale` for the best point.
    pub fn best_derived_size(&self) -> Option<i64> {
        self.best()
            .map(|best| derive_size(self.base_size, best.point.lives, best.point.scale))
    }

    pub fn feasible_count(&self) -> usize {
        self.history.iter().filter(|r| r.is_feasible()).count()
    }
}

/// Baseline run, seeded evaluations, then model-guided proposals.
pub struct Optimizer<'a, E: EnginePort, P: Proposer> {
    config: TunerConfig,
    evaluator: Evaluator<E>,
    proposer: P,
    logger: &'a RunLogger,
    interrupt: InterruptFlag,
    phase: Phase,
    baseline: BaselineRecord,
    history: Vec<EvaluationResult>,
    last_index: usize,
}

impl<'a, E: EnginePort, P: Proposer> Optimizer<'a, E, P> {
    /// INIT: load the base configuration and measure it unmodified.
    ///
    /// Any failure here aborts the run; there is no search without a baseline.
    pub fn init(
        config: TunerConfig,
        engine: E,
        proposer: P,
        logger: &'a RunLogger,
        interrupt: InterruptFlag,
    ) -> Result<Self> {
        let base = load_config(&config.base_config)?;
        let mut evaluator = Evaluator::new(
            engine,
            base,
            config.space.clone(),
            config.size_policy,
            config.policy,
        )?;

        logger.info("Running baseline");
        interrupt.check()?;
        let baseline = evaluator.run_baseline(&config.base_config)?;
        logger.info(format!("Baseline metrics: {}", baseline.snapshot.display()));
        logger.info(format!(
            "Baseline throughput {:.2}, resulting paths {:.0}, mem {:.1}",
            baseline.throughput, baseline.resulting_paths, baseline.memory
        ));

        Ok(Self {
            config,
            evaluator,
            proposer,
            logger,
            interrupt,
            phase: Phase::Init,
            baseline,
            history: Vec::new(),
            last_index: 0,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "{:?} -> {:?}", self.phase, next);
        tracing::debug!(from = ?self.phase, to = ?next, "optimizer phase");
        self.phase = next;
    }

    fn evaluate(&mut self, point: SearchPoint) -> Result<()> {
        self.interrupt.check()?;
        self.last_index += 1;
        let result =
            self.evaluator
                .evaluate(self.last_index, &point, &self.baseline, self.logger)?;
        self.history.push(result);
        Ok(())
    }

    /// Run SEEDING and SEARCHING until the call budget is spent, then report.
    pub fn run(mut self) -> Result<TunerResults> {
        self.logger.info(format!(
            "Starting Bayesian optimization ({} calls, {} policy)...",
            self.config.n_calls,
            self.config.policy.name()
        ));

        self.advance(Phase::Seeding);
        let seeds: Vec<SearchPoint> = self
            .config
            .seed_points
            .iter()
            .map(|p| self.config.space.clamp(p))
            .collect();
        for point in seeds {
            self.evaluate(point)?;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let random = self
            .config
            .initial_random
            .min(self.remaining_calls());
        for _ in 0..random {
            let point = self.config.space.sample(&mut rng);
            self.evaluate(point)?;
        }

        self.advance(Phase::Searching);
        while self.remaining_calls() > 0 {
            let point = self.proposer.suggest(&self.config.space, &self.history);
            self.evaluate(point)?;
        }

        self.advance(Phase::Done);
        let results = TunerResults {
            baseline: self.baseline,
            history: self.history,
            base_size: self.evaluator.base_size(),
        };
        report(self.logger, &results);
        Ok(results)
    }

    fn remaining_calls(&self) -> usize {
        self.config.n_calls.saturating_sub(self.history.len())
    }
}

fn report(logger: &RunLogger, results: &TunerResults) {
    logger.info("Optimization done.");
    let Some(best) = results.best() else {
        logger.warn("No evaluations were run.");
        return;
    };
    if !best.is_feasible() {
        logger.warn(format!(
            "No feasible point found in {} evaluations; reporting the least penalized.",
            results.history.len()
        ));
    }
    logger.info(format!(
        "Best lives, scale, zscore: [{}, {}, {}]",
        best.point.lives, best.point.scale, best.point.zscore
    ));
    if let Some(size) = results.best_derived_size() {
        logger.info(format!("Best size: {size}"));
    }
    logger.info(format!("Best objective: {}", best.score));
}
