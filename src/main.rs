//! parish-records CLI
//!
//! Summaries, currency sums and location lookups from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Add up account entries
//! parish-records sum 0,0,17 1,19,11
//!
//! # Disbursement summaries, also written to output/<table>.txt
//! parish-records summary --input disbursements.json --output-dir output
//!
//! # Resolve marriage parishes against a saved grid reference finder export
//! parish-records locate --names marriages.json --export gridrefs.csv
//!
//! # Generate a random register for testing
//! parish-records generate --parishes 10 --records 200
//! ```

use log::{info, warn};
use parish_records::aggregation::summary::SummaryReport;
use parish_records::config::PipelineConfig;
use parish_records::core::money::{parse_column, sum_columns, Lsd};
use parish_records::core::ratio::Ratio;
use parish_records::core::record::DisbursementSet;
use parish_records::demography::marriage::{MarriageRecord, MarriageRegister};
use parish_records::demography::population::{PopulationRecord, PopulationSeries};
use parish_records::demography::tax::{RatePayerRecord, RateRolls};
use parish_records::location::cache::LocationCache;
use parish_records::location::export::ExportFileLookup;
use parish_records::location::resolver::{ResolveOptions, Resolver};
use parish_records::simulation::synthetic::{generate_register, RegisterConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

fn print_usage() {
    eprintln!(
        r#"parish-records: parish register and churchwardens' account analysis

USAGE:
    parish-records <COMMAND> [OPTIONS]

COMMANDS:
    sum         Total a list of pounds,shillings,pence entries
    summary     Disbursement summaries: category share, rankings, annual totals
    locate      Resolve parish names into the location cache
    population  Annual baptism/burial change and cumulative series
    marriages   Marriage pair counts and located network edges
    tax         Rate-payer cohort retention by year
    generate    Generate a random disbursement register (for testing)
    help        Show this message

OPTIONS (sum):
    <P,S,D>...           Entries given row-wise
    --columns <P,...> <S,...> <D,...>
                         Entries given column-wise: all pounds, all shillings, all pence

OPTIONS (summary):
    --input <FILE>       Path to JSON disbursements file
    --config <FILE>      Pipeline configuration (JSON)
    --format <FORMAT>    Output format: text (default) or json
    --output-dir <DIR>   Where <table>.txt files go (default from config)

OPTIONS (locate):
    --names <FILE>       JSON array of names, or a marriages file
    --export <FILE>      Grid reference finder CSV export to resolve against
    --cache <FILE>       Location cache (default from config)
    --config <FILE>      Pipeline configuration (JSON)

OPTIONS (population):
    --input <FILE>       Path to JSON population records file
    --format <FORMAT>    Output format: text (default) or json

OPTIONS (marriages):
    --input <FILE>       Path to JSON marriages file
    --cache <FILE>       Location cache; prints located edges when given
    --config <FILE>      Pipeline configuration (JSON)

OPTIONS (tax):
    --input <FILE>       JSON rate_payers file: year and name per entry
    --format <FORMAT>    Output format: text (default) or json

OPTIONS (generate):
    --parishes <N>       Number of parishes (default: 5)
    --records <N>        Records per parish (default: 50)
    --seed <N>           Fixed random seed
    --output <FILE>      Write to file instead of stdout

EXAMPLES:
    parish-records sum 0,0,17 1,19,11
    parish-records sum --columns 0,1 0,19 17,11
    parish-records summary --input disbursements.json --format json
    parish-records locate --names marriages.json --export gridrefs.csv
    parish-records marriages --input marriages.json --cache output/parish_locations.csv
    parish-records tax --input rate_payers.json
    parish-records generate --parishes 20 --records 100 --output test.json"#
    );
}

#[derive(serde::Deserialize)]
struct PopulationFile {
    records: Vec<PopulationRecord>,
}

#[derive(serde::Deserialize)]
struct MarriagesFile {
    marriages: Vec<MarriageRecord>,
}

#[derive(serde::Deserialize)]
struct RatePayersFile {
    rate_payers: Vec<RatePayerRecord>,
}

/// A names file is either a plain list or a marriages file.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum NamesFile {
    Names(Vec<String>),
    Marriages(MarriagesFile),
}

#[derive(serde::Serialize)]
struct PopulationRow {
    year: i32,
    baptisms: u64,
    burials: u64,
    change: i64,
    cumulative_change: i64,
    ratio: Ratio,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// The value following the option at `i`.
fn option_value(args: &[String], i: usize, hint: &str) -> String {
    args.get(i + 1).cloned().unwrap_or_else(|| {
        eprintln!("{} requires {}", args[i], hint);
        process::exit(1);
    })
}

fn option_number<T: std::str::FromStr>(args: &[String], i: usize) -> T {
    option_value(args, i, "a number").parse().unwrap_or_else(|_| {
        eprintln!("{} requires a number", args[i]);
        process::exit(1);
    })
}

fn load_json<T: DeserializeOwned>(path: &str) -> T {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON in '{}': {}", path, e);
        process::exit(1);
    })
}

fn load_config(path: Option<&str>) -> PipelineConfig {
    match path {
        Some(path) => PipelineConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => PipelineConfig::default(),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e))
}

fn open_cache(path: &Path) -> LocationCache {
    LocationCache::open(path).unwrap_or_else(|e| fail(e))
}

fn cmd_sum(args: &[String]) {
    if args.is_empty() {
        eprintln!("sum requires at least one pounds,shillings,pence entry");
        process::exit(1);
    }

    if args[0] == "--columns" {
        if args.len() != 4 {
            fail("--columns requires three lists: <POUNDS> <SHILLINGS> <PENCE>");
        }
        let column = |s: &String| parse_column(s).unwrap_or_else(|e| fail(e));
        let (pounds, shillings, pence) = (column(&args[1]), column(&args[2]), column(&args[3]));
        let total = sum_columns(&pounds, &shillings, &pence).unwrap_or_else(|e| fail(e));
        println!("{} entries", pounds.len());
        println!("Total: {}", total);
        return;
    }

    let values: Vec<Lsd> = args
        .iter()
        .map(|a| a.parse::<Lsd>().unwrap_or_else(|e| fail(e)))
        .collect();
    let total = Lsd::sum(&values).unwrap_or_else(|e| fail(e));

    for value in &values {
        println!("  {}", value);
    }
    println!("Total: {}", total);
}

fn cmd_summary(args: &[String]) {
    let mut input_path = None;
    let mut config_path = None;
    let mut output_dir: Option<PathBuf> = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(option_value(args, i, "a file path")),
            "--config" => config_path = Some(option_value(args, i, "a file path")),
            "--format" => format = option_value(args, i, "'text' or 'json'"),
            "--output-dir" => output_dir = Some(option_value(args, i, "a directory").into()),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 2;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let config = load_config(config_path.as_deref());
    let set: DisbursementSet = load_json(&path);
    info!("Loaded {} disbursements from {}", set.len(), path);

    let report = SummaryReport::build(&set, &config).unwrap_or_else(|e| fail(e));

    let dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
    fs::create_dir_all(&dir).unwrap_or_else(|e| fail(e));
    for table in &report.tables {
        let file = dir.join(format!("{}.txt", table.name));
        fs::write(&file, table.to_string()).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", file.display(), e);
            process::exit(1);
        });
        info!("Wrote {}", file.display());
    }

    if format == "json" {
        println!("{}", to_json(&report));
    } else {
        print!("{}", report);
    }
}

fn cmd_locate(args: &[String]) {
    let mut names_path = None;
    let mut export_path = None;
    let mut cache_path: Option<PathBuf> = None;
    let mut config_path = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--names" => names_path = Some(option_value(args, i, "a file path")),
            "--export" => export_path = Some(option_value(args, i, "a file path")),
            "--cache" => cache_path = Some(option_value(args, i, "a file path").into()),
            "--config" => config_path = Some(option_value(args, i, "a file path")),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 2;
    }

    let names_path = names_path.unwrap_or_else(|| fail("--names <FILE> is required"));
    let export_path = export_path.unwrap_or_else(|| fail("--export <FILE> is required"));
    let config = load_config(config_path.as_deref());
    let cache_path = cache_path.unwrap_or_else(|| config.cache_path.clone());

    let names: Vec<String> = match load_json::<NamesFile>(&names_path) {
        NamesFile::Names(names) => names,
        NamesFile::Marriages(file) => MarriageRegister::new(file.marriages)
            .parishes()
            .into_iter()
            .collect(),
    };

    let mut cache = open_cache(&cache_path);
    let mut resolver = Resolver::with_policy(
        ExportFileLookup::new(&export_path, config.match_mode),
        config.match_mode,
    )
    .with_options(ResolveOptions {
        retry_unresolved: config.retry_unresolved,
    });

    let report = resolver
        .resolve(&mut cache, &names)
        .unwrap_or_else(|e| fail(e));

    if let Some(failure) = &report.lookup_failure {
        warn!("Lookup against '{}' failed: {}", export_path, failure);
    }
    println!("Already cached: {}", report.already_cached.len());
    println!("Looked up:      {}", report.looked_up.len());
    println!("Found:          {}", report.found.len());
    println!("Unresolved:     {}", report.unresolved.len());
    for name in &report.unresolved {
        println!("  - {}", name);
    }
    println!(
        "Cache {} now holds {} entries ({} located)",
        cache.path().display(),
        cache.len(),
        cache.located(&config.out_of_region_marker).count()
    );
}

fn cmd_population(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(option_value(args, i, "a file path")),
            "--format" => format = option_value(args, i, "'text' or 'json'"),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 2;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let file: PopulationFile = load_json(&path);
    let series = PopulationSeries::from_records(&file.records);

    if format == "json" {
        let rows: Vec<PopulationRow> = series
            .years()
            .zip(series.cumulative_change())
            .map(|((year, counts), (_, cumulative_change))| PopulationRow {
                year,
                baptisms: counts.baptisms(),
                burials: counts.burials(),
                change: counts.change(),
                cumulative_change,
                ratio: Ratio::of(counts.baptisms(), counts.burials()),
            })
            .collect();
        println!("{}", to_json(&rows));
    } else {
        print!("{}", series);
    }
}

fn cmd_marriages(args: &[String]) {
    let mut input_path = None;
    let mut cache_path: Option<PathBuf> = None;
    let mut config_path = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(option_value(args, i, "a file path")),
            "--cache" => cache_path = Some(option_value(args, i, "a file path").into()),
            "--config" => config_path = Some(option_value(args, i, "a file path")),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 2;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let config = load_config(config_path.as_deref());
    let file: MarriagesFile = load_json(&path);
    let register = MarriageRegister::new(file.marriages);

    match cache_path {
        Some(cache_path) => {
            let cache = open_cache(&cache_path);
            let edges =
                register.network_edges(&cache, &config.match_mode, &config.out_of_region_marker);
            println!("{}", to_json(&edges));
        }
        None => {
            let counts = register.pair_counts();
            println!("{:<30} {:<30} {:>6}", "Groom parish", "Bride parish", "Count");
            for ((groom, bride), count) in &counts {
                println!("{:<30} {:<30} {:>6}", groom, bride, count);
            }
            println!(
                "\n{} marriages, {} distinct pairs, {} parishes",
                register.len(),
                counts.len(),
                register.parishes().len()
            );
        }
    }
}

fn cmd_tax(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input_path = Some(option_value(args, i, "a file path")),
            "--format" => format = option_value(args, i, "'text' or 'json'"),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 2;
    }

    let path = input_path.unwrap_or_else(|| fail("--input <FILE> is required"));
    let file: RatePayersFile = load_json(&path);
    let rolls = RateRolls::from_records(&file.rate_payers);
    info!("Loaded {} rate rolls from {}", rolls.len(), path);
    let table = rolls.retention();

    if format == "json" {
        println!("{}", to_json(&table));
    } else {
        print!("{}", table);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = RegisterConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--parishes" => config.parish_count = option_number(args, i),
            "--records" => config.records_per_parish = option_number(args, i),
            "--seed" => config.seed = Some(option_number(args, i)),
            "--output" => output_path = Some(option_value(args, i, "a file path")),
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 2;
    }

    let set = generate_register(&config);
    let json = to_json(&set);

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} disbursements across {} parishes → {}",
            set.len(),
            config.parish_count,
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "sum" => cmd_sum(rest),
        "summary" => cmd_summary(rest),
        "locate" => cmd_locate(rest),
        "population" => cmd_population(rest),
        "marriages" => cmd_marriages(rest),
        "tax" => cmd_tax(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
