use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hvmc::analysis::static_structure_factor;
use hvmc::{channel_fleet, read_config, run_worker, write_record, DensityCorrelation, SimContext};

#[derive(Parser, Debug)]
#[command(version, about = "Distributed VMC for Hubbard-type lattice models", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Where to write the run record; overrides `output` in the config
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads; overrides `workers` in the config
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hvmc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut cfg = read_config(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    if let Some(workers) = args.workers {
        if workers == 0 {
            bail!("--workers must be at least 1");
        }
        cfg.workers = workers;
    }
    if args.output.is_some() {
        cfg.output = args.output;
    }

    info!(workers = cfg.workers, seed = cfg.seed, electrons = cfg.electrons, "starting");
    let (mut master, links) = channel_fleet(cfg.workers);
    let mut handles = Vec::with_capacity(cfg.workers);
    for mut link in links {
        let ctx = SimContext::new(link.worker_id(), cfg.workers, cfg.seed);
        let worker_cfg = cfg.clone();
        let handle = thread::Builder::new()
            .name(format!("worker-{}", ctx.worker_id))
            .spawn(move || run_worker(ctx, &mut link, |_| worker_cfg.setup_run()))
            .context("spawning worker thread")?;
        handles.push(handle);
    }

    let mut scheduler = cfg.scheduler()?;
    let outcome = scheduler.run(&mut master, cfg.parameters.clone(), cfg.run.clone());
    drop(master);

    for handle in handles {
        match handle.join() {
            Ok(Ok(runs)) => info!(runs, "worker finished"),
            Ok(Err(err)) => error!(error = %err, "worker stopped with an error"),
            Err(_) => error!("worker thread panicked"),
        }
    }

    let record = outcome?;
    if let Some(path) = &cfg.output {
        write_record(path, &record).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "run record written");
    }

    let Some(last) = record.last() else {
        bail!("no iteration produced usable statistics");
    };
    println!("VMC results after {} iteration(s)", record.iterations.len());
    println!("----------------------------------------");
    println!("Parameters: {:?}", record.final_parameters.as_slice());
    for (name, estimate) in &last.result.estimates {
        if let (Some(mean), Some(err)) = (estimate.mean.as_scalar(), estimate.error.as_scalar()) {
            println!("{:>8}: {:.6} ± {:.6} ({} bins)", name, mean, err, estimate.bins);
        }
    }
    for (worker, drift) in &last.drift {
        println!(
            "worker {}: {} recalcs, hit rate {:.3}",
            worker,
            drift.recalcs,
            drift.hit_rate()
        );
    }

    if let Some(nncorr) = last
        .result
        .get(DensityCorrelation::NAME)
        .and_then(|est| est.mean.as_vector())
    {
        let lattice = cfg.lattice.build()?;
        println!("Static structure factor");
        for (q, s) in static_structure_factor(lattice.as_ref(), nncorr)? {
            println!("  q = {:?}: {:.6}", q.as_slice(), s);
        }
    }
    Ok(())
}
