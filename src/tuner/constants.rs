/// Metric names the engine must print on every successful run.
pub const RESULTING_PATHS: &str = "resulting paths";
pub const EXECUTION_TIME: &str = "execution time";
pub const WINDOWS_CREATED: &str = "windows created";
pub const AVG_WINDOW_SIZE: &str = "avg window size";

pub const REQUIRED_METRICS: [&str; 4] = [
    RESULTING_PATHS,
    EXECUTION_TIME,
    WINDOWS_CREATED,
    AVG_WINDOW_SIZE,
];

/// Configuration keys the tuner reads or overrides.
pub const KEY_SIZE: &str = "size";
pub const KEY_SLIDE: &str = "slide";
pub const KEY_LIVES: &str = "lives";
pub const KEY_ZSCORE: &str = "zscore";

// ─────────────────────────────────────────────────────────────────────────────
// Penalties
// ─────────────────────────────────────────────────────────────────────────────

/// Score for a point skipped because its window size does not exceed the slide.
pub const SKIP_PENALTY: f64 = 1e6;

/// Added to every result-count violation.
pub const RESULT_FIDELITY_BASE_PENALTY: f64 = 1e5;

/// Accepted relative overshoot of the baseline result count.
pub const RESULT_FIDELITY_TOLERANCE: f64 = 0.05;

/// Added to every memory-band violation.
pub const MEMORY_BAND_BASE_PENALTY: f64 = 1e4;

/// Accepted memory band, relative to the baseline estimate.
pub const MEMORY_BAND_LOWER: f64 = 0.9;
pub const MEMORY_BAND_UPPER: f64 = 1.1;

/// Weights of the directional terms steering `scale` and `zscore`.
pub const MEMORY_BAND_SCALE_WEIGHT: f64 = 500.0;
pub const MEMORY_BAND_ZSCORE_WEIGHT: f64 = 300.0;

/// Extra window-size headroom over the slide used by the floor policy.
pub const FLOOR_MARGIN: i64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Search defaults
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_N_CALLS: usize = 30;
pub const DEFAULT_SEED: u64 = 0;

pub const DEFAULT_LIVES: (i64, i64) = (8, 12);
pub const DEFAULT_SCALE: (f64, f64) = (0.11, 0.2);
pub const DEFAULT_ZSCORE: (f64, f64) = (1.8, 2.8);

/// Hand-picked starting points `(lives, scale, zscore)` spread over the default space.
pub const SEED_POINTS: [(i64, f64, f64); 3] = [(10, 0.13, 2.0), (11, 0.15, 2.5), (9, 0.12, 1.8)];
