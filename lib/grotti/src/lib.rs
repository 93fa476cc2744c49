pub mod api;
pub mod engine;
pub mod error;
pub mod shuffle;
pub mod stats;
pub mod storage;

pub use api::{
    natural_order, Chunk, Group, Job, KeyOrder, LineSerializer, Mapper, Record, Reducer,
    SourceSpec,
};
pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use stats::RunSummary;
pub use storage::{FsStorage, MemStorage, MemWrite, Storage};
