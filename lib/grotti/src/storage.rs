use crate::api::Record;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// The source/sink boundary the engine depends on. Implementations own all
/// listing, parsing and persistence mechanics; the engine only ever sees
/// file identifiers, parsed records and serialized lines.
pub trait Storage: Send + Sync {
    /// All file identifiers under one source path.
    fn list_files(&self, source_path: &str) -> Result<Vec<String>>;

    /// The full record batch of one file (not streaming).
    fn read_records(&self, file: &str) -> Result<Vec<Record>>;

    /// Persists one chunk's lines under the destination. Only called with
    /// non-empty line sets; must create the destination container if absent.
    fn write(&self, dest: &str, chunk_index: usize, lines: &[String]) -> Result<()>;
}

/// Chunk file name under `dest`: zero-padded, fixed-width, 1-based.
pub fn chunk_file_name(dest: &str, chunk_index: usize) -> String {
    format!("{}/part-{:03}.tsv", dest, chunk_index)
}

pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref())
        .with_context(|| format!("create_dir_all {}", path.as_ref().display()))
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}

// ========== Filesystem adapter ==========

/// Reads header-row TSV files under a source directory and writes chunk
/// files under the output directory.
#[derive(Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn list_files(&self, source_path: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(source_path) {
            let entry = entry.with_context(|| format!("list {}", source_path))?;
            if entry.file_type().is_file() {
                files.push(entry.path().display().to_string());
            }
        }
        // walkdir order is platform-dependent; sort for stable task layout
        files.sort();
        Ok(files)
    }

    fn read_records(&self, file: &str) -> Result<Vec<Record>> {
        let content = fs::read_to_string(file).with_context(|| format!("read {}", file))?;
        let mut lines = content.lines();
        let header: Vec<&str> = match lines.next() {
            Some(h) => h.split('\t').collect(),
            None => return Ok(Vec::new()),
        };
        let mut records = Vec::new();
        for (idx, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != header.len() {
                bail!(
                    "{}:{}: expected {} fields, got {}",
                    file,
                    idx + 2,
                    header.len(),
                    fields.len()
                );
            }
            let record: Record = header
                .iter()
                .zip(fields)
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            records.push(record);
        }
        Ok(records)
    }

    fn write(&self, dest: &str, chunk_index: usize, lines: &[String]) -> Result<()> {
        let path = chunk_file_name(dest, chunk_index);
        let mut writer = open_writer(&path)?;
        for line in lines {
            writeln!(writer, "{}", line).with_context(|| format!("write {}", path))?;
        }
        writer.flush().with_context(|| format!("flush {}", path))?;
        Ok(())
    }
}

// ========== In-memory test double ==========

/// One captured sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemWrite {
    pub dest: String,
    pub chunk_index: usize,
    pub lines: Vec<String>,
}

/// In-memory Storage double: sources and files are preloaded maps, writes
/// are captured for inspection. Lets engine tests run without a filesystem.
#[derive(Default)]
pub struct MemStorage {
    sources: Mutex<HashMap<String, Vec<String>>>,
    files: Mutex<HashMap<String, Vec<Record>>>,
    writes: Mutex<Vec<MemWrite>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `source_path` with its record batch.
    pub fn add_file(&self, source_path: &str, file: &str, records: Vec<Record>) {
        self.sources
            .lock()
            .unwrap()
            .entry(source_path.to_string())
            .or_default()
            .push(file.to_string());
        self.files.lock().unwrap().insert(file.to_string(), records);
    }

    /// Registers a source with no files.
    pub fn add_empty_source(&self, source_path: &str) {
        self.sources.lock().unwrap().entry(source_path.to_string()).or_default();
    }

    /// All writes captured so far, in arbitrary (parallel completion) order.
    pub fn writes(&self) -> Vec<MemWrite> {
        self.writes.lock().unwrap().clone()
    }
}

impl Storage for MemStorage {
    fn list_files(&self, source_path: &str) -> Result<Vec<String>> {
        match self.sources.lock().unwrap().get(source_path) {
            Some(files) => Ok(files.clone()),
            None => bail!("unknown source {}", source_path),
        }
    }

    fn read_records(&self, file: &str) -> Result<Vec<Record>> {
        match self.files.lock().unwrap().get(file) {
            Some(records) => Ok(records.clone()),
            None => bail!("unknown file {}", file),
        }
    }

    fn write(&self, dest: &str, chunk_index: usize, lines: &[String]) -> Result<()> {
        self.writes.lock().unwrap().push(MemWrite {
            dest: dest.to_string(),
            chunk_index,
            lines: lines.to_vec(),
        });
        Ok(())
    }
}
