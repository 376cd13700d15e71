use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::engine::PopulationData;
use crate::error::ObserverError;

pub const DB_NAME: &str = "evolution.db";

const CREATE_TABLE: &str = "CREATE TABLE generations(
    id INTEGER NOT NULL PRIMARY KEY,
    best_fitness REAL NOT NULL,
    mean_fitness REAL NOT NULL,
    fitness_stddev REAL NOT NULL,
    natural_fitness INTEGER NOT NULL,
    pop_size INTEGER NOT NULL,
    elite_count INTEGER NOT NULL,
    gen_number INTEGER NOT NULL,
    elapsed INTEGER NOT NULL);";

/// numeric part of a generation snapshot, one row per observed generation
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRow {
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub fitness_stddev: f64,
    pub natural_fitness: bool,
    pub pop_size: usize,
    pub elite_count: usize,
    pub gen_number: u64,
    pub elapsed_seconds: u64,
}

impl GenerationRow {
    pub fn from_data<C>(data: &PopulationData<C>) -> Self {
        Self {
            best_fitness: data.best_fitness,
            mean_fitness: data.mean_fitness,
            fitness_stddev: data.fitness_std_dev,
            natural_fitness: data.natural_fitness,
            pop_size: data.population_size,
            elite_count: data.elite_count,
            gen_number: data.generation,
            elapsed_seconds: data.elapsed.as_secs(),
        }
    }
}

/// append-only sqlite table of generation statistics.
/// opening replaces whatever database a previous run left in the directory.
pub struct StatsStore {
    conn: Connection,
    path: PathBuf,
}

impl StatsStore {
    pub fn open(dir: &Path) -> Result<Self, ObserverError> {
        let path = dir.join(DB_NAME);
        if path.exists() {
            fs::remove_file(&path).map_err(|source| ObserverError::Io { path: path.clone(), source })?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&self, row: &GenerationRow) -> Result<(), ObserverError> {
        self.conn.execute(
            "INSERT INTO generations(
                best_fitness, mean_fitness, fitness_stddev, natural_fitness,
                pop_size, elite_count, gen_number, elapsed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.best_fitness,
                row.mean_fitness,
                row.fitness_stddev,
                row.natural_fitness,
                row.pop_size as i64,
                row.elite_count as i64,
                row.gen_number as i64,
                row.elapsed_seconds as i64,
            ],
        )?;
        Ok(())
    }

    /// every row in insertion order
    pub fn rows(&self) -> Result<Vec<GenerationRow>, ObserverError> {
        let mut stmt = self.conn.prepare(
            "SELECT best_fitness, mean_fitness, fitness_stddev, natural_fitness,
                    pop_size, elite_count, gen_number, elapsed
             FROM generations ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(GenerationRow {
                best_fitness: row.get(0)?,
                mean_fitness: row.get(1)?,
                fitness_stddev: row.get(2)?,
                natural_fitness: row.get(3)?,
                pop_size: row.get::<_, i64>(4)? as usize,
                elite_count: row.get::<_, i64>(5)? as usize,
                gen_number: row.get::<_, i64>(6)? as u64,
                elapsed_seconds: row.get::<_, i64>(7)? as u64,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}
