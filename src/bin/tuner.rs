use clap::Parser;
use tracing_subscriber::EnvFilter;

use stream_tuner::cli::Args;
use stream_tuner::error::{Result, TunerError};
use stream_tuner::logging::RunLogger;
use stream_tuner::tuner::{
    print_topk, write_best_json, write_csv, GaussianProcessProposer, InterruptFlag, Optimizer,
    ProcessEngine,
};

fn main() {
    let args = Args::parse();

    let logger = match RunLogger::create(&args.log_dir) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Error creating log in {:?}: {}", args.log_dir, e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(logger.tracing_writer())
        .with_ansi(false)
        .init();

    let code = match run(&args, &logger) {
        Ok(()) => 0,
        Err(TunerError::Interrupted) => {
            logger.warn("Interrupted; stopping search.");
            130
        }
        Err(e) => {
            logger.warn(format!("Error: {}", e));
            1
        }
    };

    // Close the log before exiting; `process::exit` skips destructors.
    drop(logger);
    std::process::exit(code);
}

fn run(args: &Args, logger: &RunLogger) -> Result<()> {
    let config = args.tuner_config()?;
    if let Some(path) = logger.path() {
        logger.info(format!("Logging to {:?}", path));
    }

    let interrupt = InterruptFlag::install()?;
    let engine = ProcessEngine::new(&args.binary, interrupt.clone());
    let proposer = GaussianProcessProposer::new(config.seed);

    let results = Optimizer::init(config, engine, proposer, logger, interrupt)?.run()?;

    print_topk(logger, &results.history, args.topk);
    logger.info(format!(
        "{} of {} evaluations feasible",
        results.feasible_count(),
        results.history.len()
    ));

    if let Some(path) = &args.csv {
        write_csv(&results.history, path)?;
        logger.info(format!("Wrote all results to {:?}", path));
    }

    if let Some(path) = &args.json {
        write_best_json(&results, path)?;
        logger.info(format!("Wrote best result to {:?}", path));
    }

    Ok(())
}
