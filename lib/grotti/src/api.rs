use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

// ========== Core data model ==========

/// One parsed input row: field name -> field value. Records are produced by a
/// Storage adapter and handed to mappers as-is; the engine never inspects
/// individual fields.
pub type Record = BTreeMap<String, String>;

/// Total order over keys (or values), supplied per job. The engine imposes no
/// `Ord` bound on key types; sorting and chunk boundaries follow this
/// comparator exclusively.
pub type KeyOrder<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// The derived `Ord` of `T` as a `KeyOrder`.
pub fn natural_order<T: Ord + 'static>() -> KeyOrder<T> {
    Arc::new(|a: &T, b: &T| a.cmp(b))
}

/// All values mapped to one distinct key, across all sources and files.
///
/// The order of `values` is not contractual: it depends on the completion
/// order of parallel map tasks. Reducers must not depend on it unless the job
/// sets a `value_ordering` (see [`Job::set_value_ordering`]).
#[derive(Debug, Clone)]
pub struct Group<K, V> {
    pub key: K,
    pub values: Vec<V>,
}

/// A contiguous window of the sorted group sequence, at most `chunk_size`
/// groups, identified by its 1-based position. Every key in chunk `i` sorts
/// strictly before every key in chunk `i + 1`.
#[derive(Debug)]
pub struct Chunk<K, V> {
    pub index: usize,
    pub groups: Vec<Group<K, V>>,
}

// ========== Job-supplied logic seams ==========

/// Transforms the full record batch of one file into key/value entries.
///
/// A mapper may emit zero or more entries per record, skip records entirely,
/// or attach extra fields to the values it emits (e.g. a table discriminant
/// for join-style jobs). Any error aborts the whole run.
pub trait Mapper: Send + Sync {
    type Key: Send + Sync;
    type Value: Send + Sync;

    fn do_map(
        &self,
        records: Vec<Record>,
        emit: &mut dyn FnMut(Self::Key, Self::Value),
    ) -> Result<()>;
}

/// Aggregates all values of one key's group into reduced output values.
///
/// Must be a pure function of its inputs. Because value order within a group
/// is unspecified, the result must not depend on it: either reduce
/// commutatively or have the job set a `value_ordering`.
pub trait Reducer: Send + Sync {
    type Key: Send + Sync;
    type ValueIn: Send + Sync;
    type Out: Send + Sync;

    fn do_reduce(
        &self,
        key: &Self::Key,
        values: &[Self::ValueIn],
        emit: &mut dyn FnMut(Self::Out),
    ) -> Result<()>;
}

/// Turns one key's reduced values into output lines. Blank lines are dropped
/// by the engine before writing.
pub trait LineSerializer: Send + Sync {
    type Key: Send + Sync;
    type Value: Send + Sync;

    fn serialize(&self, key: &Self::Key, reduced: &[Self::Value]) -> Result<Vec<String>>;
}

// ========== Job description ==========

/// One named data source: where its files live and how its records map to
/// entries.
pub struct SourceSpec<K, V> {
    pub path: String,
    pub mapper: Arc<dyn Mapper<Key = K, Value = V>>,
}

/// A complete job description: sources with their mappers, the output
/// destination, and the key ordering. Reducer and serializer are passed to
/// [`Engine::run`](crate::Engine::run) alongside the job.
pub struct Job<K, V> {
    pub(crate) sources: Vec<SourceSpec<K, V>>,
    pub(crate) output: Option<String>,
    pub(crate) ordering: KeyOrder<K>,
    pub(crate) value_ordering: Option<KeyOrder<V>>,
}

impl<K, V> Job<K, V> {
    pub fn new(ordering: KeyOrder<K>) -> Self {
        Self { sources: Vec::new(), output: None, ordering, value_ordering: None }
    }

    pub fn add_source(
        &mut self,
        path: impl Into<String>,
        mapper: Arc<dyn Mapper<Key = K, Value = V>>,
    ) {
        self.sources.push(SourceSpec { path: path.into(), mapper });
    }

    pub fn set_output(&mut self, path: impl Into<String>) {
        self.output = Some(path.into());
    }

    /// Sort each group's values with `ordering` before reduction. This makes
    /// order-sensitive reducers deterministic across runs.
    pub fn set_value_ordering(&mut self, ordering: KeyOrder<V>) {
        self.value_ordering = Some(ordering);
    }
}
