use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use db::PersistentTable;
use db::fixture;
use db::printer::{IndexReport, format_reports, format_rows, reports_to_json};
use index::{IndexConfig, IndexScheme, IndexType};
use storage::Value;

const BENCH_INDEX: &str = "bench";
const PRIMARY_KEY: &str = "pkey";

#[derive(Parser, Debug)]
#[command(
    name = "index-bench",
    about = "Load the seven-column fixture and exercise one index over it"
)]
struct Args {
    /// Number of rows to insert.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(i64).range(1..=fixture::MAX_ROWS))]
    rows: i64,

    /// btree, hash or array.
    #[arg(long, default_value = "btree")]
    index_type: String,

    #[arg(long, conflicts_with = "multi")]
    unique: bool,

    #[arg(long)]
    multi: bool,

    /// Zero-based fixture columns forming the key.
    #[arg(long, value_delimiter = ',', default_value = "2")]
    key_columns: Vec<usize>,

    /// Build the benchmark index with the generic key encoder.
    #[arg(long)]
    generic: bool,

    /// JSON file with index configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    trace_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 1234)]
    seed: u64,

    /// Print the index report as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => IndexConfig::load(path)
            .with_context(|| format!("load index config {}", path.display()))?,
        None => IndexConfig::default(),
    };
    if args.trace_dir.is_some() {
        config.trace_dir = args.trace_dir.clone();
    }
    let index_type = IndexType::parse(&args.index_type)
        .ok_or_else(|| anyhow!("unknown index type {}", args.index_type))?;

    let schema = fixture::schema().context("build fixture schema")?;
    let primary_key = IndexScheme::new(
        PRIMARY_KEY,
        IndexType::BalancedTree,
        vec![0, 1],
        true,
        true,
        schema.clone(),
    );
    let bench = IndexScheme::new(
        BENCH_INDEX,
        index_type,
        args.key_columns.clone(),
        args.unique && !args.multi,
        !args.generic,
        schema.clone(),
    );
    let mut table = PersistentTable::new("fixture", schema, Some(primary_key), vec![bench], config)
        .context("create fixture table")?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let started = Instant::now();
    let mut rejected = 0usize;
    for i in 1..=args.rows {
        match table.insert(&fixture::row(i, &mut rng)) {
            Ok(_) => {}
            Err(db::TableError::ConstraintViolation { .. }) => rejected += 1,
            Err(error) => return Err(error).context(format!("insert row {}", i)),
        }
    }
    info!(
        "inserted {} rows ({} rejected) in {:?}",
        table.len(),
        rejected,
        started.elapsed()
    );

    // the row i = rows / 2 must be found exactly once through the primary key
    let sample = (args.rows / 2).max(1);
    let matches = table
        .lookup(PRIMARY_KEY, &[Value::Integer(sample), Value::Integer(sample % 100)])
        .context("look up sample row by primary key")?;
    if matches.len() != 1 {
        bail!("primary key lookup of row {} found {} rows", sample, matches.len());
    }
    println!("{}", format_rows(table.schema(), &matches));

    let started = Instant::now();
    let mut hits = 0usize;
    let addresses = table.rows().addresses();
    for address in &addresses {
        let Some(row) = table.rows().get(*address) else {
            continue;
        };
        let key: Vec<Value> = args
            .key_columns
            .iter()
            .filter_map(|&column| row.get(column))
            .collect();
        hits += table.lookup(BENCH_INDEX, &key)?.len();
    }
    info!(
        "{} lookups returned {} rows in {:?}",
        addresses.len(),
        hits,
        started.elapsed()
    );

    let reports: Vec<IndexReport> = table.indexes().map(IndexReport::from_index).collect();
    if args.json {
        println!("{}", reports_to_json(&reports)?);
    } else {
        println!("{}", format_reports(&reports));
    }
    Ok(())
}
