use anyhow::{Context, Result};
use clap::Parser;
use grotti::{
    natural_order, Engine, EngineConfig, FsStorage, Job, LineSerializer, Mapper, Record, Reducer,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
struct Args {
    /// Input directory of header-row TSV click logs
    #[arg(long)]
    input: String,
    /// Output directory
    #[arg(long)]
    output: String,
    /// Max groups per output chunk
    #[arg(long, default_value_t = 500)]
    chunk_size: usize,
}

struct DateMapper;

impl Mapper for DateMapper {
    type Key = String;
    type Value = u64;

    fn do_map(&self, records: Vec<Record>, emit: &mut dyn FnMut(String, u64)) -> Result<()> {
        for rec in records {
            let date = rec.get("date").context("record missing date field")?;
            emit(date.clone(), 1);
        }
        Ok(())
    }
}

struct TotalReducer;

impl Reducer for TotalReducer {
    type Key = String;
    type ValueIn = u64;
    type Out = u64;

    fn do_reduce(&self, _key: &String, values: &[u64], emit: &mut dyn FnMut(u64)) -> Result<()> {
        emit(values.iter().sum());
        Ok(())
    }
}

struct CsvTotals;

impl LineSerializer for CsvTotals {
    type Key = String;
    type Value = u64;

    fn serialize(&self, key: &String, reduced: &[u64]) -> Result<Vec<String>> {
        Ok(reduced.iter().map(|total| format!("{},{}", key, total)).collect())
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let run = || -> Result<grotti::RunSummary> {
        let engine = Engine::new(EngineConfig::new(args.chunk_size), Arc::new(FsStorage::new()))?;
        let mut job = Job::new(natural_order());
        job.add_source(&args.input, Arc::new(DateMapper));
        job.set_output(&args.output);
        Ok(engine.run(&job, &TotalReducer, &CsvTotals)?)
    };

    match run() {
        Ok(summary) => info!(
            groups = summary.shuffle.groups,
            chunks_written = summary.reduce.chunks_written,
            "daily_totals finished"
        ),
        Err(e) => {
            error!("daily_totals failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
