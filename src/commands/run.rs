//! `coachbench run` - execute an evaluation batch

use std::time::Duration;

use coachbench_core::config::EvalConfig;
use coachbench_core::control::BatchControl;
use coachbench_core::coordinator::{BatchPlan, Coordinator};
use coachbench_core::error::{EvalError, Result};
use coachbench_core::gateway::{MockGateway, ModelGateway, OpenAiGateway};
use coachbench_core::progress::Progress;
use coachbench_core::scenario;
use coachbench_core::snapshot::SnapshotStore;
use tracing::info;

use crate::cli::{Cli, OutputFormat, Provider, RunArgs};
use crate::commands::{control, render};

/// Fold command-line overrides into the resolved config
pub fn apply_overrides(config: &mut EvalConfig, args: &RunArgs) {
    if let Some(n) = args.per_model {
        config.scenarios_per_model = n;
    }
    if args.shuffle {
        config.shuffle_scenarios = true;
    }
    if args.seed.is_some() {
        config.shuffle_seed = args.seed;
    }
    if let Some(url) = &args.base_url {
        config.gateway.base_url = url.clone();
    }
}

fn build_gateway(provider: Provider, config: &EvalConfig) -> Result<Box<dyn ModelGateway>> {
    Ok(match provider {
        Provider::Mock => Box::new(MockGateway::new()),
        Provider::Openai => Box::new(
            OpenAiGateway::new(
                config.gateway.base_url.clone(),
                Duration::from_secs(config.gateway.timeout_secs),
            )?
            .with_env_keys(),
        ),
    })
}

pub fn execute(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut config = EvalConfig::resolve(cli.config.as_deref())?;
    apply_overrides(&mut config, args);
    if config.scenarios_per_model == 0 {
        coachbench_core::bail_usage!("--per-model must be at least 1");
    }

    let plan = BatchPlan {
        candidates: args.candidates.clone(),
        synthetic_user: args.synthetic.clone(),
        judge: args.judge.clone(),
        scenarios: scenario::load_dir(&args.scenarios)?,
    };
    let gateway = build_gateway(args.provider, &config)?;
    info!(gateway = gateway.name(), candidates = plan.candidates.len(), "starting batch");

    let store = args
        .snapshot
        .as_ref()
        .map(|path| SnapshotStore::new(path, config.snapshot_max_age_secs));
    let prior_runs = match (&store, args.resume) {
        (Some(store), true) => {
            let runs = store.resumable_runs()?;
            if !cli.quiet && cli.format == OutputFormat::Human {
                eprintln!("Resuming with {} recorded run(s)", runs.len());
            }
            runs
        }
        _ => Vec::new(),
    };

    let batch_control = BatchControl::new();
    control::install(&batch_control, !args.no_stdin_control);

    let mut coordinator = Coordinator::new(gateway.as_ref(), &config).with_control(batch_control);
    if let Some(store) = store {
        coordinator = coordinator.with_snapshots(store);
    }

    let show_progress = !cli.quiet && cli.format == OutputFormat::Human;
    let mut printer = render::ProgressPrinter::new();
    let mut on_progress = |progress: &Progress| {
        if !show_progress {
            return;
        }
        if let Some(line) = printer.line(progress) {
            eprintln!("{}", line);
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EvalError::Other(format!("failed to start async runtime: {}", e)))?;
    let outcome = runtime.block_on(coordinator.run_batch(&plan, prior_runs, &mut on_progress))?;

    render::print_outcome(cli, &outcome)?;
    match outcome.failure() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
