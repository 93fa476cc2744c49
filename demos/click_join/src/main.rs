//! Broadcast/inner-join through shared-key grouping: click facts and page
//! reference rows merge into the same key's group, tagged with a table
//! discriminant; the reducer locates the reference row by tag and merges it
//! into each fact. Keys with no reference row are dropped by this reducer's
//! policy.

use anyhow::{Context, Result};
use clap::Parser;
use grotti::{
    natural_order, Engine, EngineConfig, FsStorage, Job, LineSerializer, Mapper, Record, Reducer,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
struct Args {
    /// Click log directory (TSV with page_id, date columns)
    #[arg(long)]
    clicks: String,
    /// Page reference directory (TSV with page_id, title columns)
    #[arg(long)]
    pages: String,
    /// Output directory
    #[arg(long)]
    output: String,
    /// Max groups per output chunk
    #[arg(long, default_value_t = 500)]
    chunk_size: usize,
}

/// Tags every record with its table name so the reducer can tell reference
/// rows from fact rows sharing a key.
struct TagMapper {
    table: &'static str,
}

impl Mapper for TagMapper {
    type Key = String;
    type Value = Record;

    fn do_map(&self, records: Vec<Record>, emit: &mut dyn FnMut(String, Record)) -> Result<()> {
        for mut rec in records {
            let key = rec.get("page_id").context("record missing page_id field")?.clone();
            rec.insert("table".to_string(), self.table.to_string());
            emit(key, rec);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Joined {
    page_id: String,
    date: String,
    title: String,
}

struct JoinReducer;

impl Reducer for JoinReducer {
    type Key = String;
    type ValueIn = Record;
    type Out = Joined;

    fn do_reduce(&self, key: &String, values: &[Record], emit: &mut dyn FnMut(Joined)) -> Result<()> {
        let reference = values.iter().find(|v| v.get("table").map(String::as_str) == Some("pages"));
        let Some(reference) = reference else {
            // no reference row for this key; drop its facts
            return Ok(());
        };
        let title = reference.get("title").context("page row missing title field")?;
        for fact in values.iter().filter(|v| v.get("table").map(String::as_str) == Some("clicks")) {
            let date = fact.get("date").context("click row missing date field")?;
            emit(Joined { page_id: key.clone(), date: date.clone(), title: title.clone() });
        }
        Ok(())
    }
}

struct JsonLines;

impl LineSerializer for JsonLines {
    type Key = String;
    type Value = Joined;

    fn serialize(&self, _key: &String, reduced: &[Joined]) -> Result<Vec<String>> {
        reduced
            .iter()
            .map(|joined| serde_json::to_string(joined).map_err(Into::into))
            .collect()
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let run = || -> Result<grotti::RunSummary> {
        let engine = Engine::new(EngineConfig::new(args.chunk_size), Arc::new(FsStorage::new()))?;
        let mut job: Job<String, Record> = Job::new(natural_order());
        job.add_source(&args.clicks, Arc::new(TagMapper { table: "clicks" }));
        job.add_source(&args.pages, Arc::new(TagMapper { table: "pages" }));
        job.set_output(&args.output);
        // facts come out in stable order regardless of map task timing
        job.set_value_ordering(natural_order());
        Ok(engine.run(&job, &JoinReducer, &JsonLines)?)
    };

    match run() {
        Ok(summary) => info!(
            groups = summary.shuffle.groups,
            chunks_written = summary.reduce.chunks_written,
            "click_join finished"
        ),
        Err(e) => {
            error!("click_join failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
