use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::logging::RunLogger;
use crate::tuner::constants::{EXECUTION_TIME, RESULTING_PATHS};
use crate::tuner::evaluation::EvaluationResult;
use crate::tuner::search::TunerResults;

/// Round a float to n decimal places.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

/// Write every evaluation, in proposal order, to a CSV file.
pub fn write_csv(history: &[EvaluationResult], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "index",
        "lives",
        "scale",
        "zscore",
        "size",
        "outcome",
        "score",
        "throughput",
        "memory",
        "resulting_paths",
        "execution_time",
    ])?;

    for result in history {
        let metric = |name: &str| result.snapshot.as_ref().and_then(|s| s.get(name));
        wtr.write_record([
            result.index.to_string(),
            result.point.lives.to_string(),
            format!("{:.4}", result.point.scale),
            format!("{:.3}", result.point.zscore),
            result.size.to_string(),
            result.outcome.label().to_string(),
            format!("{:.3}", result.score),
            optional(result.throughput, 3),
            optional(result.memory, 1),
            optional(metric(RESULTING_PATHS), 0),
            optional(metric(EXECUTION_TIME), 3),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the best result and the baseline it was measured against as JSON.
pub fn write_best_json(results: &TunerResults, path: &Path) -> Result<()> {
    let best = results.best();
    let json = serde_json::json!({
        "best": best.map(|b| serde_json::json!({
            "index": b.index,
            "lives": b.point.lives,
            "scale": round_to(b.point.scale, 4),
            "zscore": round_to(b.point.zscore, 3),
            "size": b.size,
            "derived_size": results.best_derived_size(),
            "outcome": b.outcome,
            "score": round_to(b.score, 3),
            "throughput": b.throughput.map(|t| round_to(t, 3)),
            "memory": b.memory.map(|m| round_to(m, 1)),
        })),
        "baseline": {
            "throughput": round_to(results.baseline.throughput, 3),
            "resulting_paths": results.baseline.resulting_paths,
            "memory": round_to(results.baseline.memory, 1),
            "metrics": &results.baseline.snapshot,
        },
        "evaluations": results.history.len(),
        "feasible": results.feasible_count(),
    });

    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(&json)?.as_bytes())?;
    Ok(())
}

/// Log the k best evaluations by score.
pub fn print_topk(logger: &RunLogger, history: &[EvaluationResult], k: usize) {
    let mut ranked: Vec<&EvaluationResult> = history.iter().collect();
    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));

    logger.info(format!("\n=== Top {} Results (by score) ===\n", k.min(ranked.len())));
    for (rank, result) in ranked.iter().take(k).enumerate() {
        logger.info(format!(
            "#{}: eval #{} score={:.3} {} size={} [{}]",
            rank + 1,
            result.index,
            result.score,
            result.point.display(),
            result.size,
            result.outcome.label()
        ));
    }
}
