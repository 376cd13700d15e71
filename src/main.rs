use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use polyevolve::crossover::UnequalCrossover;
use polyevolve::dna::{Genome, GenomeFactory};
use polyevolve::engine::GenerationalEngine;
use polyevolve::fitness::ImageEvaluator;
use polyevolve::mutate::Mutator;
use polyevolve::observers::{BackgroundObserver, BestObserver, StatsObserver, StatsStore};
use polyevolve::render::{load_reference, CpuRenderer};
use polyevolve::settings::Settings;

#[derive(Parser)]
#[command(name = "polyevolve", about = "Evolve translucent polygons toward a reference image", version)]
struct Args {
    /// settings file (JSON)
    #[arg(long)]
    cfg: Option<PathBuf>,

    /// reference image, overrides the settings file
    #[arg(long)]
    img: Option<PathBuf>,

    /// output directory, overrides the settings file
    #[arg(long)]
    out: Option<PathBuf>,

    /// random seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// a fresh directory per run under `root`
fn create_run_dir(root: &Path) -> anyhow::Result<PathBuf> {
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let dir = root.join(stamp.to_string());
    fs::create_dir_all(&dir).with_context(|| format!("output directory error: {}", dir.display()))?;
    Ok(dir)
}

/// raise `abort` once `signal` fires. false when the signal can't be waited on.
async fn abort_on<S>(signal: S, abort: &AtomicBool) -> bool
where
    S: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("stop requested, finishing the current generation (ctrl-c again to quit now)");
            abort.store(true, Ordering::Relaxed);
            true
        }
        Err(e) => {
            warn!(error = %e, "can't listen for ctrl-c");
            false
        }
    }
}

/// first ctrl-c stops at the next generation boundary, a second one exits right away
fn spawn_abort_watcher(abort: Arc<AtomicBool>) {
    let spawned = thread::Builder::new().name("abort".to_owned()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "can't start the signal runtime, ctrl-c won't stop the run cleanly");
                return;
            }
        };
        runtime.block_on(async {
            if !abort_on(tokio::signal::ctrl_c(), &abort).await {
                return;
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("second stop request, exiting without saving");
                std::process::exit(130);
            }
        });
    });
    if let Err(e) = spawned {
        warn!(error = %e, "can't watch for ctrl-c, the run can only end on its own");
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    // name worker threads once, before the first parallel evaluation
    let _ = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-{i}"))
        .build_global();

    let mut settings = match &args.cfg {
        Some(path) => Settings::load(path).with_context(|| format!("read config error: {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(img) = args.img {
        settings.ref_image = Some(img);
    }
    if let Some(out) = args.out {
        settings.output_dir = out;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    settings.validate()?;

    let ref_path = settings
        .ref_image
        .clone()
        .context("no reference image: pass --img or set ref_image")?;
    info!(path = %ref_path.display(), "reference image");
    let reference = load_reference(&ref_path, settings.working_size)?;
    let (width, height) = (reference.width, reference.height);

    let run_dir = create_run_dir(&settings.output_dir)?;
    info!(dir = %run_dir.display(), "output directory");
    reference.save_png(run_dir.join("_ref.png"))?;
    settings.save(run_dir.join("settings.json"))?;

    let renderer = CpuRenderer::new(settings.render_config());
    let factory = GenomeFactory::new(width, height, settings.mutation)?;
    let mutator = Mutator::new(settings.mutation)?;
    let crossover = UnequalCrossover::new(settings.crossover_points);
    let evaluator = ImageEvaluator::new(reference, renderer)?;
    let mut engine: GenerationalEngine<Genome, _, _, _, _> =
        GenerationalEngine::new(factory, mutator, crossover, evaluator, settings.engine_config())?;

    let freq = settings.observer_frequency;
    engine.add_observer(BackgroundObserver::spawn(BestObserver::new(freq, &run_dir, renderer)?, freq)?);

    let stats = StatsObserver::new(freq, StatsStore::open(&run_dir)?)?;
    #[cfg(unix)]
    let stats = match polyevolve::observers::Notifier::bind(&run_dir) {
        Ok(notifier) => stats.with_notifier(notifier),
        Err(e) => {
            warn!(error = %e, "viewer notifications disabled");
            stats
        }
    };
    engine.add_observer(BackgroundObserver::<Genome>::spawn(stats, freq)?);

    let seed = settings.seed.unwrap_or_else(rand::random);
    info!(seed, width, height, population = settings.population_size, "starting evolution");
    let mut rng = Pcg32::seed_from_u64(seed);

    let abort = Arc::new(AtomicBool::new(false));
    spawn_abort_watcher(Arc::clone(&abort));

    let outcome = engine.evolve(&mut rng, &abort);
    let metrics = engine.evaluator().metrics(outcome.best.fitness);
    // flushes the observer threads
    drop(engine);

    info!(
        reason = ?outcome.reason,
        generations = outcome.generations,
        fitness = outcome.best.fitness,
        sad_per_px = metrics.sad_per_px,
        psnr = metrics.psnr,
        "evolution ended"
    );

    let best = &outcome.best.candidate;
    let best_png = run_dir.join("best.png");
    renderer.render(best)?.save_png(&best_png)?;
    let best_json = run_dir.join("best.json");
    fs::write(&best_json, serde_json::to_string_pretty(best)?)
        .with_context(|| format!("can't write {}", best_json.display()))?;
    info!(image = %best_png.display(), genome = %best_json.display(), "saved best candidate");

    Ok(())
}
