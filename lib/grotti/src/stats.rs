use serde::Serialize;

#[derive(Default, Clone, Debug, Serialize)]
pub struct MapStats {
    pub sources: usize,
    pub files: usize,
    pub entries: u64,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ShuffleStats {
    pub entries_in: u64,
    pub groups: u64,
    pub chunks: usize,
    pub wall_ms: u64,
}

#[derive(Default, Clone, Debug, Serialize)]
pub struct ReduceStats {
    pub chunks: usize,
    pub chunks_written: usize,
    pub chunks_skipped: usize,
    pub groups: u64,
    pub lines_out: u64,
    pub wall_ms: u64,
}

/// Per-phase aggregates for one completed run.
#[derive(Default, Clone, Debug, Serialize)]
pub struct RunSummary {
    pub map: MapStats,
    pub shuffle: ShuffleStats,
    pub reduce: ReduceStats,
}
