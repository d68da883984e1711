use serde::Serialize;

use crate::error::{Result, TunerError};
use crate::tuner::constants::{
    MEMORY_BAND_BASE_PENALTY, MEMORY_BAND_LOWER, MEMORY_BAND_SCALE_WEIGHT, MEMORY_BAND_UPPER,
    MEMORY_BAND_ZSCORE_WEIGHT, RESULT_FIDELITY_BASE_PENALTY, RESULT_FIDELITY_TOLERANCE,
};
use crate::tuner::evaluation::BaselineRecord;
use crate::tuner::metrics::MetricSnapshot;
use crate::tuner::space::{SearchPoint, SearchSpace};

/// Classification of an evaluated point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Feasible,
    /// Window size did not exceed the slide; engine not run.
    SizeBelowSlide,
    ResultCountOutOfRange,
    MemoryBelowBand,
    MemoryAboveBand,
}

impl Outcome {
    pub fn is_feasible(self) -> bool {
        self == Outcome::Feasible
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Feasible => "feasible",
            Outcome::SizeBelowSlide => "size_below_slide",
            Outcome::ResultCountOutOfRange => "result_count_out_of_range",
            Outcome::MemoryBelowBand => "memory_below_band",
            Outcome::MemoryAboveBand => "memory_above_band",
        }
    }
}

/// Score of one engine run under a constraint policy. Lower is better.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub outcome: Outcome,
    /// `-throughput` when feasible, otherwise a penalty above every feasible score.
    pub score: f64,
    pub throughput: f64,
    pub memory: f64,
    /// Soft concern worth logging that does not affect feasibility.
    pub warning: Option<String>,
}

/// Feasibility rules and penalty shaping.
///
/// Feasible points score `-throughput <= 0`; infeasible points score at least
/// the variant's positive base penalty, so the search never prefers an
/// infeasible point over a feasible one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintPolicy {
    /// Result count must stay within `[rp0, rp0 * (1 + tolerance)]`.
    ResultFidelity { tolerance: f64, base_penalty: f64 },
    /// Memory estimate must stay within `[lower * mem0, upper * mem0]`.
    MemoryBand {
        lower: f64,
        upper: f64,
        base_penalty: f64,
        scale_weight: f64,
        zscore_weight: f64,
    },
}

impl ConstraintPolicy {
    pub fn result_fidelity() -> Self {
        ConstraintPolicy::ResultFidelity {
            tolerance: RESULT_FIDELITY_TOLERANCE,
            base_penalty: RESULT_FIDELITY_BASE_PENALTY,
        }
    }

    pub fn memory_band() -> Self {
        ConstraintPolicy::MemoryBand {
            lower: MEMORY_BAND_LOWER,
            upper: MEMORY_BAND_UPPER,
            base_penalty: MEMORY_BAND_BASE_PENALTY,
            scale_weight: MEMORY_BAND_SCALE_WEIGHT,
            zscore_weight: MEMORY_BAND_ZSCORE_WEIGHT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConstraintPolicy::ResultFidelity { .. } => "result-fidelity",
            ConstraintPolicy::MemoryBand { .. } => "memory-band",
        }
    }

    /// Smallest score any infeasible engine run can receive.
    pub fn min_penalty(&self) -> f64 {
        match *self {
            ConstraintPolicy::ResultFidelity { base_penalty, .. } => base_penalty,
            ConstraintPolicy::MemoryBand { base_penalty, .. } => base_penalty,
        }
    }

    pub fn assess(
        &self,
        snapshot: &MetricSnapshot,
        baseline: &BaselineRecord,
        point: &SearchPoint,
        space: &SearchSpace,
    ) -> Result<Assessment> {
        let throughput = finite("throughput", snapshot.throughput()?)?;
        let memory = finite("memory estimate", snapshot.memory_estimate()?)?;
        let feasible = Assessment {
            outcome: Outcome::Feasible,
            score: -throughput,
            throughput,
            memory,
            warning: None,
        };

        match *self {
            ConstraintPolicy::ResultFidelity {
                tolerance,
                base_penalty,
            } => {
                let rp = finite("resulting paths", snapshot.resulting_paths()?)?;
                let rp0 = baseline.resulting_paths;
                let upper = rp0 * (1.0 + tolerance);

                if rp < rp0 || rp > upper {
                    return Ok(Assessment {
                        outcome: Outcome::ResultCountOutOfRange,
                        score: base_penalty + (rp - rp0).abs(),
                        warning: Some(format!(
                            "resulting paths {rp:.0} outside [{rp0:.0}, {upper:.0}]"
                        )),
                        ..feasible
                    });
                }

                let warning = (memory > baseline.memory).then(|| {
                    format!(
                        "memory {memory:.1} > baseline {:.1}",
                        baseline.memory
                    )
                });
                Ok(Assessment { warning, ..feasible })
            }
            ConstraintPolicy::MemoryBand {
                lower,
                upper,
                base_penalty,
                scale_weight,
                zscore_weight,
            } => {
                let low = baseline.memory * lower;
                let high = baseline.memory * upper;

                if memory < low {
                    // Push toward larger scale and zscore.
                    let directional = scale_weight * (space.scale.upper - point.scale).max(0.0)
                        + zscore_weight * (space.zscore.upper - point.zscore).max(0.0);
                    return Ok(Assessment {
                        outcome: Outcome::MemoryBelowBand,
                        score: base_penalty + (low - memory) + directional,
                        warning: Some(format!(
                            "memory {memory:.1} < {:.0}% of baseline {:.1}, increasing scale/zscore recommended",
                            lower * 100.0,
                            baseline.memory
                        )),
                        ..feasible
                    });
                }

                if memory > high {
                    // Push toward smaller scale and zscore.
                    let directional = scale_weight * (point.scale - space.scale.lower).max(0.0)
                        + zscore_weight * (point.zscore - space.zscore.lower).max(0.0);
                    return Ok(Assessment {
                        outcome: Outcome::MemoryAboveBand,
                        score: base_penalty + (memory - high) + directional,
                        warning: Some(format!(
                            "memory {memory:.1} > {:.0}% of baseline {:.1}, decreasing scale/zscore recommended",
                            upper * 100.0,
                            baseline.memory
                        )),
                        ..feasible
                    });
                }

                Ok(feasible)
            }
        }
    }
}

/// Reject NaN and infinities before any band comparison.
pub(crate) fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TunerError::MetricParse(format!("{name} is not finite: {value}")))
    }
}

impl Default for ConstraintPolicy {
    fn default() -> Self {
        ConstraintPolicy::memory_band()
    }
}
