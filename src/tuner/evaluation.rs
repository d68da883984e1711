use std::path::Path;

use serde::Serialize;

use crate::config::{save_config, Configuration};
use crate::error::Result;
use crate::logging::RunLogger;
use crate::tuner::constants::{KEY_LIVES, KEY_SIZE, KEY_SLIDE, KEY_ZSCORE};
use crate::tuner::engine::EnginePort;
use crate::tuner::metrics::MetricSnapshot;
use crate::tuner::policy::{finite, ConstraintPolicy, Outcome};
use crate::tuner::space::{derive_size, SearchPoint, SearchSpace, SizeDecision, SizePolicy};

/// The unmodified base configuration and the metrics it produced.
///
/// Built once per run, before any search point is evaluated.
#[derive(Debug, Clone)]
pub struct BaselineRecord {
    pub config: Configuration,
    pub snapshot: MetricSnapshot,
    pub resulting_paths: f64,
    pub throughput: f64,
    pub memory: f64,
}

impl BaselineRecord {
    pub fn new(config: Configuration, snapshot: MetricSnapshot) -> Result<Self> {
        Ok(Self {
            resulting_paths: finite("baseline resulting paths", snapshot.resulting_paths()?)?,
            throughput: finite("baseline throughput", snapshot.throughput()?)?,
            memory: finite("baseline memory estimate", snapshot.memory_estimate()?)?,
            config,
            snapshot,
        })
    }
}

/// Result of evaluating one search point.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    /// 1-based proposal order.
    pub index: usize,
    pub point: SearchPoint,
    /// Window size written to the candidate configuration.
    pub size: i64,
    /// `None` when the point was skipped without running the engine.
    #[serde(skip)]
    pub snapshot: Option<MetricSnapshot>,
    pub outcome: Outcome,
    /// Objective (`-throughput`) or penalty; lower is better.
    pub score: f64,
    pub throughput: Option<f64>,
    pub memory: Option<f64>,
}

impl EvaluationResult {
    pub fn is_feasible(&self) -> bool {
        self.outcome.is_feasible()
    }
}

/// Turns search points into scored engine runs.
pub struct Evaluator<E: EnginePort> {
    engine: E,
    base: Configuration,
    base_size: f64,
    slide: i64,
    space: SearchSpace,
    size_policy: SizePolicy,
    policy: ConstraintPolicy,
}

impl<E: EnginePort> Evaluator<E> {
    /// Reads `size` and `slide` from the base configuration.
    pub fn new(
        engine: E,
        base: Configuration,
        space: SearchSpace,
        size_policy: SizePolicy,
        policy: ConstraintPolicy,
    ) -> Result<Self> {
        let base_size = base.parse_value::<f64>(KEY_SIZE)?;
        let slide = base.parse_value::<i64>(KEY_SLIDE)?;
        Ok(Self {
            engine,
            base,
            base_size,
            slide,
            space,
            size_policy,
            policy,
        })
    }

    pub fn base_size(&self) -> f64 {
        self.base_size
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the engine on the base configuration file as-is.
    pub fn run_baseline(&mut self, base_path: &Path) -> Result<BaselineRecord> {
        let snapshot = self.engine.run(base_path)?;
        BaselineRecord::new(self.base.clone(), snapshot)
    }

    /// Merge the point's parameters into a copy of the base configuration.
    pub fn candidate_config(&self, point: &SearchPoint, size: i64) -> Configuration {
        self.base.merge([
            (KEY_LIVES, point.lives.to_string()),
            (KEY_SIZE, size.to_string()),
            (KEY_ZSCORE, point.zscore.to_string()),
        ])
    }

    /// Evaluate one point: apply the size policy, write a temporary
    /// configuration, run the engine and score the metrics.
    ///
    /// The temporary file is removed on every exit path.
    pub fn evaluate(
        &mut self,
        index: usize,
        point: &SearchPoint,
        baseline: &BaselineRecord,
        logger: &RunLogger,
    ) -> Result<EvaluationResult> {
        let derived = derive_size(self.base_size, point.lives, point.scale);

        let size = match self.size_policy.apply(derived, self.slide) {
            SizeDecision::Skip { size, penalty } => {
                logger.info(format!(
                    "Eval #{index}: size {size} <= slide {}, skipping.",
                    self.slide
                ));
                return Ok(EvaluationResult {
                    index,
                    point: *point,
                    size,
                    snapshot: None,
                    outcome: Outcome::SizeBelowSlide,
                    score: penalty,
                    throughput: None,
                    memory: None,
                });
            }
            SizeDecision::Run { size } => size,
        };

        logger.info(format!(
            "\nEval #{index}: lives={}, size={size}, zscore={:.2} (scale={:.4})",
            point.lives, point.zscore, point.scale
        ));

        let candidate = self.candidate_config(point, size);
        let temp = tempfile::Builder::new()
            .prefix("tuner_config_")
            .suffix(".txt")
            .tempfile()?;
        save_config(temp.path(), &candidate)?;
        let snapshot = self.engine.run(temp.path())?;
        temp.close()?;

        let assessment = self.policy.assess(&snapshot, baseline, point, &self.space)?;
        if let Some(warning) = &assessment.warning {
            logger.warn(format!(" Warning -> {warning}"));
        }

        let kind = if assessment.outcome.is_feasible() {
            "objective"
        } else {
            "penalty"
        };
        logger.info(format!(
            "  -> throughput {:.2}, resulting paths {:.0}, exec. time {}, mem {:.1}, {kind} {:.2}",
            assessment.throughput,
            snapshot.resulting_paths()?,
            snapshot.execution_time()?,
            assessment.memory,
            assessment.score
        ));

        Ok(EvaluationResult {
            index,
            point: *point,
            size,
            outcome: assessment.outcome,
            score: assessment.score,
            throughput: Some(assessment.throughput),
            memory: Some(assessment.memory),
            snapshot: Some(snapshot),
        })
    }
}
