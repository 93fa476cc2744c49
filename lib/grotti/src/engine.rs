use crate::api::{Job, LineSerializer, Mapper, Reducer};
use crate::error::EngineError;
use crate::shuffle;
use crate::stats::{MapStats, ReduceStats, RunSummary, ShuffleStats};
use crate::storage::Storage;
use rayon::prelude::*;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Constructor-level engine configuration. `chunk_size` bounds the number of
/// groups per output chunk; `threads` sizes the engine-owned worker pool
/// (defaults to the machine's logical CPU count).
pub struct EngineConfig {
    pub chunk_size: usize,
    pub threads: Option<usize>,
}

impl EngineConfig {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size, threads: None }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// The map-reduce execution engine.
///
/// A run has two parallel regions separated by a hard barrier: the map phase
/// (parallel over files within a source, sequential across sources) and the
/// reduce phase (parallel over chunks, sequential within a chunk). Both run
/// on a worker pool owned by this engine, so concurrent engine instances
/// never contend on a shared global pool.
pub struct Engine {
    chunk_size: usize,
    pool: rayon::ThreadPool,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("chunk_size", &self.chunk_size)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

struct ChunkOutcome {
    groups: u64,
    lines: u64,
    written: bool,
}

impl Engine {
    pub fn new(config: EngineConfig, storage: Arc<dyn Storage>) -> Result<Self, EngineError> {
        if config.chunk_size == 0 {
            return Err(EngineError::InvalidConfig("chunk_size must be positive".into()));
        }
        let threads = config.threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        Ok(Self { chunk_size: config.chunk_size, pool, storage })
    }

    /// Executes one job to completion. The first error at any stage aborts
    /// the run; chunks already written stay on disk (no rollback).
    pub fn run<K, V, R, S>(
        &self,
        job: &Job<K, V>,
        reducer: &R,
        serializer: &S,
    ) -> Result<RunSummary, EngineError>
    where
        K: Hash + Eq + Send + Sync,
        V: Send + Sync,
        R: Reducer<Key = K, ValueIn = V>,
        S: LineSerializer<Key = K, Value = R::Out>,
    {
        let output = job
            .output
            .clone()
            .ok_or_else(|| EngineError::InvalidConfig("output not set".into()))?;

        info!(
            sources = job.sources.len(),
            chunk_size = self.chunk_size,
            threads = self.pool.current_num_threads(),
            "grotti starting run"
        );

        // ---- Region 1: map ----
        let map_start = Instant::now();
        let mut entries: Vec<(K, V)> = Vec::new();
        let mut files_total = 0usize;
        for source in &job.sources {
            let files = self
                .storage
                .list_files(&source.path)
                .map_err(|cause| EngineError::ListSource {
                    source_path: source.path.clone(),
                    cause,
                })?;
            debug!(source = %source.path, files = files.len(), "map source starting");
            files_total += files.len();

            let mapped: Vec<Vec<(K, V)>> = self.pool.install(|| {
                files
                    .par_iter()
                    .map(|file| {
                        let records = self
                            .storage
                            .read_records(file)
                            .map_err(|cause| EngineError::ReadFile { file: file.clone(), cause })?;
                        let mut out: Vec<(K, V)> = Vec::new();
                        source
                            .mapper
                            .do_map(records, &mut |k, v| out.push((k, v)))
                            .map_err(|cause| EngineError::Map {
                                source_path: source.path.clone(),
                                file: file.clone(),
                                cause,
                            })?;
                        Ok(out)
                    })
                    .collect::<Result<_, EngineError>>()
            })?;
            for file_entries in mapped {
                entries.extend(file_entries);
            }
        }
        let map_stats = MapStats {
            sources: job.sources.len(),
            files: files_total,
            entries: entries.len() as u64,
            wall_ms: map_start.elapsed().as_millis() as u64,
        };
        info!(
            phase = "map",
            sources = map_stats.sources,
            files = map_stats.files,
            entries = map_stats.entries,
            wall_ms = map_stats.wall_ms,
            "map phase complete"
        );

        // ---- Barrier: shuffle, sort, chunk (fully materialized) ----
        let shuffle_start = Instant::now();
        let entries_in = entries.len() as u64;
        let mut groups = shuffle::group_entries(entries);
        shuffle::sort_groups(&mut groups, &job.ordering);
        let group_count = groups.len() as u64;
        let chunks = shuffle::chunk_groups(groups, self.chunk_size);
        let shuffle_stats = ShuffleStats {
            entries_in,
            groups: group_count,
            chunks: chunks.len(),
            wall_ms: shuffle_start.elapsed().as_millis() as u64,
        };
        info!(
            phase = "shuffle",
            entries = shuffle_stats.entries_in,
            groups = shuffle_stats.groups,
            chunks = shuffle_stats.chunks,
            wall_ms = shuffle_stats.wall_ms,
            "shuffle phase complete"
        );

        // ---- Region 2: reduce + write ----
        let reduce_start = Instant::now();
        let chunk_count = chunks.len();
        let storage = &self.storage;
        let value_ordering = job.value_ordering.as_ref();
        let outcomes: Vec<ChunkOutcome> = self.pool.install(|| {
            chunks
                .into_par_iter()
                .map(|mut chunk| {
                    let mut lines: Vec<String> = Vec::new();
                    for group in &mut chunk.groups {
                        if let Some(ordering) = value_ordering {
                            group.values.sort_by(|a, b| ordering(a, b));
                        }
                        let mut reduced: Vec<R::Out> = Vec::new();
                        reducer
                            .do_reduce(&group.key, &group.values, &mut |out| reduced.push(out))
                            .map_err(|cause| EngineError::Reduce { chunk: chunk.index, cause })?;
                        let group_lines = serializer
                            .serialize(&group.key, &reduced)
                            .map_err(|cause| EngineError::Serialize { chunk: chunk.index, cause })?;
                        lines.extend(group_lines.into_iter().filter(|l| !l.trim().is_empty()));
                    }
                    let groups = chunk.groups.len() as u64;
                    if lines.is_empty() {
                        // Empty chunks consume their index but produce no file.
                        debug!(chunk = chunk.index, "chunk serialized empty, skipping write");
                        return Ok(ChunkOutcome { groups, lines: 0, written: false });
                    }
                    storage
                        .write(&output, chunk.index, &lines)
                        .map_err(|cause| EngineError::Write { chunk: chunk.index, cause })?;
                    Ok(ChunkOutcome { groups, lines: lines.len() as u64, written: true })
                })
                .collect::<Result<_, EngineError>>()
        })?;
        let chunks_written = outcomes.iter().filter(|o| o.written).count();
        let reduce_stats = ReduceStats {
            chunks: chunk_count,
            chunks_written,
            chunks_skipped: chunk_count - chunks_written,
            groups: outcomes.iter().map(|o| o.groups).sum(),
            lines_out: outcomes.iter().map(|o| o.lines).sum(),
            wall_ms: reduce_start.elapsed().as_millis() as u64,
        };
        info!(
            phase = "reduce",
            chunks = reduce_stats.chunks,
            written = reduce_stats.chunks_written,
            skipped = reduce_stats.chunks_skipped,
            lines = reduce_stats.lines_out,
            wall_ms = reduce_stats.wall_ms,
            "reduce phase complete"
        );

        Ok(RunSummary { map: map_stats, shuffle: shuffle_stats, reduce: reduce_stats })
    }
}
