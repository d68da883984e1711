pub mod constants;
pub mod engine;
pub mod evaluation;
pub mod metrics;
pub mod output;
pub mod policy;
pub mod search;
pub mod space;
pub mod surrogate;

pub use engine::{EnginePort, InterruptFlag, ProcessEngine};
pub use evaluation::{BaselineRecord, EvaluationResult, Evaluator};
pub use metrics::MetricSnapshot;
pub use output::{print_topk, write_best_json, write_csv};
pub use policy::{Assessment, ConstraintPolicy, Outcome};
pub use search::{Optimizer, Phase, TunerConfig, TunerResults};
pub use space::{derive_size, Dimension, DimensionKind, SearchPoint, SearchSpace, SizePolicy};
pub use surrogate::{GaussianProcessProposer, GpConfig, Proposer, RandomProposer};
