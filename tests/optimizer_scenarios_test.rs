use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use assert_float_eq::*;
use tempfile::TempDir;

use stream_tuner::config::{load_config, save_config, Configuration};
use stream_tuner::error::{Result, TunerError};
use stream_tuner::logging::RunLogger;
use stream_tuner::tuner::constants::{
    AVG_WINDOW_SIZE, EXECUTION_TIME, RESULTING_PATHS, RESULT_FIDELITY_BASE_PENALTY,
    SKIP_PENALTY, WINDOWS_CREATED,
};
use stream_tuner::tuner::{
    BaselineRecord, ConstraintPolicy, EnginePort, Evaluator, GaussianProcessProposer,
    InterruptFlag, MetricSnapshot, Optimizer, Outcome, Phase, RandomProposer, SearchPoint,
    SearchSpace, SizePolicy, TunerConfig,
};

fn metrics(rp: f64, time: f64, windows: f64, avg: f64) -> MetricSnapshot {
    MetricSnapshot::from_pairs([
        (RESULTING_PATHS, rp),
        (EXECUTION_TIME, time),
        (WINDOWS_CREATED, windows),
        (AVG_WINDOW_SIZE, avg),
    ])
}

/// One engine invocation as seen by the stub.
#[derive(Debug, Clone)]
struct Call {
    path: PathBuf,
    config: Configuration,
}

/// Deterministic engine: smaller windows run faster, memory grows with
/// window size and zscore.
struct StubEngine {
    calls: Rc<RefCell<Vec<Call>>>,
    fail_on_call: Option<usize>,
}

impl StubEngine {
    fn new() -> (Self, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                calls: Rc::clone(&calls),
                fail_on_call: None,
            },
            calls,
        )
    }
}

impl EnginePort for StubEngine {
    fn run(&mut self, config_path: &Path) -> Result<MetricSnapshot> {
        let config = load_config(config_path)?;
        let size: f64 = config.parse_value("size")?;
        let zscore: f64 = config.parse_value("zscore")?;

        let mut calls = self.calls.borrow_mut();
        calls.push(Call {
            path: config_path.to_path_buf(),
            config,
        });
        if self.fail_on_call == Some(calls.len()) {
            return Err(TunerError::MetricParse("'resulting paths' missing".into()));
        }

        let time = 1.0 + size / 1000.0;
        let avg = size * zscore / 30.0;
        Ok(metrics(100.0, time, 5.0, avg))
    }
}

struct Fixture {
    _dir: TempDir,
    base_path: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let base_path = dir.path().join("baseline.txt");
    let base: Configuration = [
        ("algorithm", "adwin"),
        ("input_data_path", "data/stream.csv"),
        ("output_base_folder", "results/"),
        ("size", "10000"),
        ("slide", "60"),
        ("query_type", "1"),
        ("labels", "a,b"),
        ("zscore", "3"),
        ("lives", "4"),
        ("watermark", "0"),
        ("ooo_strategy", "drop"),
    ]
    .into_iter()
    .collect();
    save_config(&base_path, &base).unwrap();
    Fixture {
        _dir: dir,
        base_path,
    }
}

fn config(fixture: &Fixture, n_calls: usize) -> TunerConfig {
    TunerConfig {
        base_config: fixture.base_path.clone(),
        n_calls,
        space: SearchSpace::new((2, 8), (0.5, 4.0), (1.0, 6.0)).unwrap(),
        ..TunerConfig::default()
    }
}

fn baseline_calls(calls: &[Call], base_path: &Path) -> usize {
    calls.iter().filter(|c| c.path == base_path).count()
}

#[test]
fn test_full_run_respects_budget_and_ordering() {
    let fixture = fixture();
    let (engine, calls) = StubEngine::new();
    let logger = RunLogger::console_only();

    let optimizer = Optimizer::init(
        config(&fixture, 8),
        engine,
        GaussianProcessProposer::new(0),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap();
    assert_eq!(optimizer.phase(), Phase::Init);

    let results = optimizer.run().unwrap();
    let calls = calls.borrow();

    assert_eq!(results.history.len(), 8);
    let indices: Vec<usize> = results.history.iter().map(|r| r.index).collect();
    assert_eq!(indices, (1..=8).collect::<Vec<_>>());

    assert_eq!(baseline_calls(&calls, &fixture.base_path), 1);
    assert_eq!(calls[0].path, fixture.base_path);

    let space = SearchSpace::new((2, 8), (0.5, 4.0), (1.0, 6.0)).unwrap();
    for result in &results.history {
        assert!(space.contains(&result.point), "{}", result.point.display());
    }

    // Temporary candidate configurations are gone.
    for call in calls.iter().skip(1) {
        assert!(!call.path.exists(), "{:?} left behind", call.path);
    }

    let best = results.best().unwrap();
    let min = results
        .history
        .iter()
        .map(|r| r.score)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(best.score, min);
}

#[test]
fn test_seed_points_are_evaluated_first() {
    let fixture = fixture();
    let (engine, calls) = StubEngine::new();
    let logger = RunLogger::console_only();

    let results = Optimizer::init(
        config(&fixture, 5),
        engine,
        RandomProposer::new(1),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    let seeds = [(10, 0.13, 2.0), (11, 0.15, 2.5), (9, 0.12, 1.8)];
    let space = SearchSpace::new((2, 8), (0.5, 4.0), (1.0, 6.0)).unwrap();
    for (result, &(lives, scale, zscore)) in results.history.iter().zip(&seeds) {
        assert_eq!(result.point, space.clamp(&SearchPoint::new(lives, scale, zscore)));
    }
    // Clamped seeds give 10000 / 8 * 0.5 = 625 > slide, so all three ran.
    assert_eq!(calls.borrow().len(), 1 + 5);
}

#[test]
fn test_baseline_runs_once_even_when_a_point_matches_it() {
    let fixture = fixture();
    let (engine, calls) = StubEngine::new();
    let logger = RunLogger::console_only();

    // lives=4, scale=4 → size = 10000 / 4 * 4 = 10000, zscore=3: the base configuration.
    let mut config = config(&fixture, 3);
    config.seed_points = vec![SearchPoint::new(4, 4.0, 3.0); 3];

    let results = Optimizer::init(
        config,
        engine,
        RandomProposer::new(0),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 4);
    assert_eq!(baseline_calls(&calls, &fixture.base_path), 1);
    for (call, result) in calls.iter().skip(1).zip(&results.history) {
        assert_eq!(call.config.get("size"), Some("10000"));
        assert!(result.is_feasible());
        assert_float_absolute_eq!(result.score, -results.baseline.throughput, 1e-9);
    }
}

#[test]
fn test_seeds_beyond_budget_still_run() {
    let fixture = fixture();
    let (engine, calls) = StubEngine::new();
    let logger = RunLogger::console_only();

    let results = Optimizer::init(
        config(&fixture, 1),
        engine,
        GaussianProcessProposer::new(0),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    assert_eq!(results.history.len(), 3);
    assert_eq!(calls.borrow().len(), 4);
}

#[test]
fn test_initial_random_points_fill_budget() {
    let fixture = fixture();
    let (engine, _calls) = StubEngine::new();
    let logger = RunLogger::console_only();

    let mut config = config(&fixture, 6);
    config.initial_random = 10;

    let results = Optimizer::init(
        config,
        engine,
        GaussianProcessProposer::new(0),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    // 3 seeds + 3 random points exhaust the budget; no model proposals.
    assert_eq!(results.history.len(), 6);
}

#[test]
fn test_engine_error_aborts_the_run() {
    let fixture = fixture();
    let (mut engine, calls) = StubEngine::new();
    engine.fail_on_call = Some(3);
    let logger = RunLogger::console_only();

    let result = Optimizer::init(
        config(&fixture, 10),
        engine,
        GaussianProcessProposer::new(0),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap()
    .run();

    assert!(matches!(result, Err(TunerError::MetricParse(_))));
    let calls = calls.borrow();
    assert_eq!(calls.len(), 3);
    // The failing evaluation's temporary file was still removed.
    assert!(!calls[2].path.exists());
}

#[test]
fn test_baseline_failure_is_fatal() {
    let fixture = fixture();
    let (mut engine, _calls) = StubEngine::new();
    engine.fail_on_call = Some(1);
    let logger = RunLogger::console_only();

    let result = Optimizer::init(
        config(&fixture, 10),
        engine,
        RandomProposer::new(0),
        &logger,
        InterruptFlag::default(),
    );
    assert!(matches!(result, Err(TunerError::MetricParse(_))));
}

#[test]
fn test_interrupt_stops_before_next_evaluation() {
    let fixture = fixture();
    let (engine, calls) = StubEngine::new();
    let logger = RunLogger::console_only();
    let interrupt = InterruptFlag::default();

    let optimizer = Optimizer::init(
        config(&fixture, 10),
        engine,
        RandomProposer::new(0),
        &logger,
        interrupt.clone(),
    )
    .unwrap();
    interrupt.raise();

    assert!(matches!(optimizer.run(), Err(TunerError::Interrupted)));
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_run_log_records_progress() {
    let fixture = fixture();
    let (engine, _calls) = StubEngine::new();
    let log_dir = tempfile::tempdir().unwrap();
    let logger = RunLogger::create(log_dir.path()).unwrap();
    let log_path = logger.path().unwrap().to_path_buf();

    Optimizer::init(
        config(&fixture, 4),
        engine,
        GaussianProcessProposer::new(0),
        &logger,
        InterruptFlag::default(),
    )
    .unwrap()
    .run()
    .unwrap();
    drop(logger);

    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("Running baseline"));
    assert!(log.contains("Eval #1:"));
    assert!(log.contains("Eval #4:"));
    assert!(!log.contains("Eval #5:"));
    assert!(log.contains("Optimization done."));
    assert!(log.contains("Best objective:"));
}

/// Ctrl-C arriving while the engine runs: raises the flag mid-run and fails
/// the way `ProcessEngine` does.
struct InterruptingEngine {
    interrupt: InterruptFlag,
    interrupt_on_call: usize,
    calls: Vec<(PathBuf, bool)>,
}

impl EnginePort for InterruptingEngine {
    fn run(&mut self, config_path: &Path) -> Result<MetricSnapshot> {
        self.calls.push((config_path.to_path_buf(), config_path.exists()));
        if self.calls.len() == self.interrupt_on_call {
            self.interrupt.raise();
            return Err(TunerError::Interrupted);
        }
        Ok(metrics(100.0, 10.0, 5.0, 1000.0))
    }
}

#[test]
fn test_interrupt_during_evaluation_removes_temp_config() {
    let fixture = fixture();
    let interrupt = InterruptFlag::default();
    let engine = InterruptingEngine {
        interrupt: interrupt.clone(),
        interrupt_on_call: 3,
        calls: Vec::new(),
    };
    let log_dir = tempfile::tempdir().unwrap();
    let logger = RunLogger::create(log_dir.path()).unwrap();
    let log_path = logger.path().unwrap().to_path_buf();

    let optimizer = Optimizer::init(
        config(&fixture, 10),
        engine,
        RandomProposer::new(0),
        &logger,
        interrupt.clone(),
    )
    .unwrap();
    let result = optimizer.run();
    drop(logger);

    assert!(matches!(result, Err(TunerError::Interrupted)));
    assert!(interrupt.is_raised());

    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("Eval #2:"));
    assert!(!log.contains("Eval #3:"));
    assert!(!log.contains("Optimization done."));
}

#[test]
fn test_interrupted_candidate_file_is_gone() {
    let fixture = fixture();
    let interrupt = InterruptFlag::default();
    let base = load_config(&fixture.base_path).unwrap();
    let mut evaluator = Evaluator::new(
        InterruptingEngine {
            interrupt: interrupt.clone(),
            interrupt_on_call: 1,
            calls: Vec::new(),
        },
        base,
        SearchSpace::new((2, 8), (0.5, 4.0), (1.0, 6.0)).unwrap(),
        SizePolicy::skip(),
        ConstraintPolicy::memory_band(),
    )
    .unwrap();
    let logger = RunLogger::console_only();
    let baseline = BaselineRecord::new(Configuration::new(), metrics(100.0, 10.0, 5.0, 1000.0))
        .unwrap();

    let result = evaluator.evaluate(1, &SearchPoint::new(4, 1.0, 2.0), &baseline, &logger);
    assert!(matches!(result, Err(TunerError::Interrupted)));

    let (path, existed_during_run) = &evaluator.engine().calls[0];
    assert!(*existed_during_run);
    assert!(!path.exists(), "{path:?} left behind");
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoring scenarios
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the same metrics for every run.
struct FixedEngine {
    snapshot: MetricSnapshot,
    runs: usize,
}

impl EnginePort for FixedEngine {
    fn run(&mut self, _config_path: &Path) -> Result<MetricSnapshot> {
        self.runs += 1;
        Ok(self.snapshot.clone())
    }
}

fn scenario_evaluator(
    snapshot: MetricSnapshot,
    size_policy: SizePolicy,
) -> Evaluator<FixedEngine> {
    let base: Configuration = [("size", "1000"), ("slide", "60")].into_iter().collect();
    Evaluator::new(
        FixedEngine { snapshot, runs: 0 },
        base,
        SearchSpace::new((1, 12), (0.01, 2.0), (1.0, 3.0)).unwrap(),
        size_policy,
        ConstraintPolicy::result_fidelity(),
    )
    .unwrap()
}

fn scenario_baseline() -> BaselineRecord {
    BaselineRecord::new(Configuration::new(), metrics(100.0, 10.0, 5.0, 20.0)).unwrap()
}

#[test]
fn test_result_fidelity_feasible_scenario() {
    let baseline = scenario_baseline();
    assert_float_absolute_eq!(baseline.throughput, 10.0, 1e-12);

    let mut evaluator = scenario_evaluator(metrics(101.0, 9.0, 5.0, 19.0), SizePolicy::skip());
    let logger = RunLogger::console_only();
    let result = evaluator
        .evaluate(1, &SearchPoint::new(1, 1.0, 2.0), &baseline, &logger)
        .unwrap();

    assert!(result.is_feasible());
    assert_float_absolute_eq!(result.throughput.unwrap(), 11.22, 0.01);
    assert_float_absolute_eq!(result.score, -11.22, 0.01);
}

#[test]
fn test_result_fidelity_infeasible_scenario() {
    let baseline = scenario_baseline();
    let mut evaluator = scenario_evaluator(metrics(150.0, 9.0, 5.0, 19.0), SizePolicy::skip());
    let logger = RunLogger::console_only();
    let result = evaluator
        .evaluate(1, &SearchPoint::new(1, 1.0, 2.0), &baseline, &logger)
        .unwrap();

    assert_eq!(result.outcome, Outcome::ResultCountOutOfRange);
    assert_float_absolute_eq!(result.score, RESULT_FIDELITY_BASE_PENALTY + 50.0, 1e-9);
}

#[test]
fn test_skip_policy_scenario() {
    let baseline = scenario_baseline();
    let mut evaluator = scenario_evaluator(metrics(100.0, 10.0, 5.0, 20.0), SizePolicy::skip());
    let logger = RunLogger::console_only();
    let result = evaluator
        .evaluate(1, &SearchPoint::new(10, 0.05, 2.0), &baseline, &logger)
        .unwrap();

    assert_eq!(result.size, 5);
    assert_eq!(result.outcome, Outcome::SizeBelowSlide);
    assert_eq!(result.score, SKIP_PENALTY);
    assert_eq!(evaluator.engine().runs, 0);
}
