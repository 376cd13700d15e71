// Observers module organization
// store: sqlite statistics table, notifier: unix socket "newdata" channel,
// this file: the periodic observers and the background thread wrapper

#[cfg(unix)]
pub mod notifier;
pub mod store;

#[cfg(unix)]
pub use notifier::Notifier;
pub use store::{GenerationRow, StatsStore};

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::dna::Genome;
use crate::engine::{EvolutionObserver, PopulationData};
use crate::error::ObserverError;
use crate::render::CpuRenderer;

fn check_freq(freq: u64) -> Result<u64, ObserverError> {
    if freq == 0 {
        Err(ObserverError::ZeroFrequency)
    } else {
        Ok(freq)
    }
}

/// every `freq` generations: append a statistics row, then ping the viewer
pub struct StatsObserver {
    freq: u64,
    store: StatsStore,
    #[cfg(unix)]
    notifier: Option<Notifier>,
}

impl StatsObserver {
    pub fn new(freq: u64, store: StatsStore) -> Result<Self, ObserverError> {
        Ok(Self {
            freq: check_freq(freq)?,
            store,
            #[cfg(unix)]
            notifier: None,
        })
    }

    #[cfg(unix)]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &StatsStore {
        &self.store
    }
}

impl<C> EvolutionObserver<C> for StatsObserver {
    fn population_update(&mut self, data: &PopulationData<C>) {
        if data.generation % self.freq != 0 {
            return;
        }
        if let Err(e) = self.store.insert(&GenerationRow::from_data(data)) {
            warn!(generation = data.generation, error = %e, "couldn't store generation stats");
            return;
        }
        #[cfg(unix)]
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }
}

/// every `freq` generations: log the fitness summary and save the best genome as `<gen>.png`
pub struct BestObserver {
    freq: u64,
    out_dir: PathBuf,
    renderer: CpuRenderer,
}

impl BestObserver {
    pub fn new(freq: u64, out_dir: impl Into<PathBuf>, renderer: CpuRenderer) -> Result<Self, ObserverError> {
        Ok(Self { freq: check_freq(freq)?, out_dir: out_dir.into(), renderer })
    }

    pub fn snapshot_path(&self, generation: u64) -> PathBuf {
        self.out_dir.join(format!("{generation}.png"))
    }

    fn save(&self, genome: &Genome, path: &Path) {
        let saved = self.renderer.render(genome).and_then(|raster| raster.save_png(path));
        if let Err(e) = saved {
            warn!(path = %path.display(), error = %e, "couldn't save best candidate");
        }
    }
}

impl EvolutionObserver<Genome> for BestObserver {
    fn population_update(&mut self, data: &PopulationData<Genome>) {
        if data.generation % self.freq != 0 {
            return;
        }
        info!(
            generation = data.generation,
            best = data.best_fitness,
            mean = data.mean_fitness,
            stddev = data.fitness_std_dev,
            polygons = data.best_candidate.polys.len(),
            "progress"
        );
        self.save(&data.best_candidate, &self.snapshot_path(data.generation));
    }
}

/// runs an observer on its own thread so disk and socket writes never stall
/// the generational loop. only every `freq`-th generation is cloned and queued;
/// dropping the wrapper drains the queue and joins the thread.
pub struct BackgroundObserver<C> {
    freq: u64,
    tx: Option<mpsc::Sender<PopulationData<C>>>,
    handle: Option<JoinHandle<()>>,
}

impl<C: Send + 'static> BackgroundObserver<C> {
    pub fn spawn<O>(mut observer: O, freq: u64) -> Result<Self, ObserverError>
    where
        O: EvolutionObserver<C> + 'static,
    {
        let freq = check_freq(freq)?;
        let (tx, rx) = mpsc::channel::<PopulationData<C>>();
        let handle = thread::Builder::new()
            .name("observer".to_owned())
            .spawn(move || {
                for data in rx {
                    observer.population_update(&data);
                }
            })
            .map_err(|source| ObserverError::Io { path: PathBuf::new(), source })?;
        Ok(Self { freq, tx: Some(tx), handle: Some(handle) })
    }
}

impl<C: Clone + Send + 'static> EvolutionObserver<C> for BackgroundObserver<C> {
    fn population_update(&mut self, data: &PopulationData<C>) {
        if data.generation % self.freq != 0 {
            return;
        }
        if let Some(tx) = &self.tx {
            if tx.send(data.clone()).is_err() {
                warn!("observer thread is gone, dropping its updates");
                self.tx = None;
            }
        }
    }
}

impl<C> Drop for BackgroundObserver<C> {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("observer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossover::UnequalCrossover;
    use crate::dna::{GenomeFactory, Polygon};
    use crate::engine::{EngineConfig, EvolutionOutcome, GenerationalEngine, TerminationReason};
    use crate::fitness::ImageEvaluator;
    use crate::mutate::Mutator;
    use crate::mutation_config::{MutateConfig, PolygonBounds};
    use crate::render::Raster;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn data(generation: u64) -> PopulationData<Genome> {
        PopulationData {
            generation,
            best_candidate: Genome {
                width: 16,
                height: 16,
                background: Some([0, 0, 0, 255]),
                polys: vec![Polygon { points: vec![(0, 0), (16, 0), (0, 16)], rgba: [255, 0, 0, 40] }],
            },
            best_fitness: 100.0 - generation as f64,
            mean_fitness: 150.0,
            fitness_std_dev: 5.0,
            natural_fitness: false,
            population_size: 10,
            elite_count: 2,
            elapsed: Duration::from_secs(generation),
        }
    }

    #[test]
    fn test_zero_frequency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path()).unwrap();
        assert!(matches!(StatsObserver::new(0, store), Err(ObserverError::ZeroFrequency)));
        assert!(matches!(
            BestObserver::new(0, dir.path(), CpuRenderer::default()),
            Err(ObserverError::ZeroFrequency)
        ));
    }

    #[test]
    fn test_stats_observer_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let mut obs = StatsObserver::new(3, StatsStore::open(dir.path()).unwrap()).unwrap();
        for generation in 0..7 {
            obs.population_update(&data(generation));
        }
        let gens: Vec<u64> = obs.store().rows().unwrap().iter().map(|r| r.gen_number).collect();
        assert_eq!(gens, vec![0, 3, 6]);

        let rows = obs.store().rows().unwrap();
        assert_eq!(rows[1], GenerationRow::from_data(&data(3)));
        assert_eq!(rows[1].elapsed_seconds, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_stats_observer_pings_viewer() {
        use std::io::Read;
        use std::os::unix::net::UnixStream;

        let dir = tempfile::tempdir().unwrap();
        let notifier = Notifier::bind(dir.path()).unwrap();
        let mut viewer = UnixStream::connect(notifier.path()).unwrap();
        while notifier.accepted_count() == 0 {
            thread::sleep(Duration::from_millis(5));
        }

        let store = StatsStore::open(dir.path()).unwrap();
        let mut obs = StatsObserver::new(1, store).unwrap().with_notifier(notifier);
        obs.population_update(&data(0));

        let mut buf = [0u8; 7];
        viewer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, notifier::MARKER);
    }

    #[test]
    fn test_best_observer_writes_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let mut obs = BestObserver::new(2, dir.path(), CpuRenderer::default()).unwrap();
        for generation in 0..5 {
            obs.population_update(&data(generation));
        }
        for generation in 0..5 {
            assert_eq!(obs.snapshot_path(generation).exists(), generation % 2 == 0);
        }
        let img = image::open(obs.snapshot_path(0)).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[test]
    fn test_best_observer_survives_bad_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut obs = BestObserver::new(1, dir.path().join("missing"), CpuRenderer::default()).unwrap();
        obs.population_update(&data(0));
        assert!(!obs.snapshot_path(0).exists());
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<u64>>>);
    impl EvolutionObserver<Genome> for Recorder {
        fn population_update(&mut self, data: &PopulationData<Genome>) {
            self.0.lock().unwrap().push(data.generation);
        }
    }

    #[test]
    fn test_background_observer_delivers_in_order() {
        let rec = Recorder::default();
        {
            let mut bg = BackgroundObserver::<Genome>::spawn(rec.clone(), 1).unwrap();
            for generation in 0..20 {
                bg.population_update(&data(generation));
            }
        }
        assert_eq!(*rec.0.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_background_observer_only_queues_observed_generations() {
        let rec = Recorder::default();
        {
            let mut bg = BackgroundObserver::<Genome>::spawn(rec.clone(), 5).unwrap();
            for generation in 0..20 {
                bg.population_update(&data(generation));
            }
        }
        assert_eq!(*rec.0.lock().unwrap(), vec![0, 5, 10, 15]);
        assert!(matches!(
            BackgroundObserver::<Genome>::spawn(Recorder::default(), 0),
            Err(ObserverError::ZeroFrequency)
        ));
    }

    fn run_engine(seed: u64, observe: Option<&Path>) -> EvolutionOutcome<Genome> {
        let cfg = MutateConfig {
            bounds: PolygonBounds { min_polygons: 2, max_polygons: 6, min_points: 3, max_points: 5 },
            ..MutateConfig::default()
        };
        let renderer = CpuRenderer::default();
        let reference = Raster::filled(16, 16, [90, 140, 200, 255]);
        let mut engine: GenerationalEngine<Genome, _, _, _, _> = GenerationalEngine::new(
            GenomeFactory::new(16, 16, cfg).unwrap(),
            Mutator::new(cfg).unwrap(),
            UnequalCrossover::new(1),
            ImageEvaluator::new(reference, renderer).unwrap(),
            EngineConfig {
                population_size: 8,
                elite_count: 1,
                max_generations: Some(4),
                target_fitness: None,
                ..EngineConfig::default()
            },
        )
        .unwrap();

        if let Some(dir) = observe {
            let stats = StatsObserver::new(1, StatsStore::open(dir).unwrap()).unwrap();
            engine.add_observer(BackgroundObserver::spawn(stats, 1).unwrap());
            let best = BestObserver::new(1, dir, renderer).unwrap();
            engine.add_observer(BackgroundObserver::spawn(best, 1).unwrap());
        }

        let mut rng = Pcg32::seed_from_u64(seed);
        let outcome = engine.evolve(&mut rng, &AtomicBool::new(false));
        // joins the observer threads
        drop(engine);
        outcome
    }

    #[test]
    fn test_full_run_with_background_observers() {
        let dir = tempfile::tempdir().unwrap();
        let observed = run_engine(11, Some(dir.path()));
        assert_eq!(observed.generations, 4);
        assert_eq!(observed.reason, TerminationReason::GenerationLimit);

        let conn = rusqlite::Connection::open(dir.path().join(store::DB_NAME)).unwrap();
        let mut stmt = conn.prepare("SELECT gen_number, best_fitness FROM generations ORDER BY id").unwrap();
        let rows: Vec<(i64, f64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        // the elite carries over, so the best never gets worse
        assert!(rows.windows(2).all(|w| w[1].1 <= w[0].1));
        assert_eq!(rows[3].1, observed.best.fitness);

        for generation in 0..4 {
            assert!(dir.path().join(format!("{generation}.png")).exists());
        }

        // observers consume snapshots only, so the same seed replays without them
        let plain = run_engine(11, None);
        assert_eq!(plain.best.candidate, observed.best.candidate);
        assert_eq!(plain.best.fitness, observed.best.fitness);
    }
}
