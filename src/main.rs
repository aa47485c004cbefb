use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ragbench::export::{self, summary::render_table, DateSelector, ExportCategory, ExportRequest};
use ragbench::report::{self, Phase};
use ragbench::{aggregate, loader, Config, MethodAggregate, MethodStatus};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ragbench")]
#[command(about = "Aggregate and compare retrieval evaluation results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare retrieval methods or LLM models from their rated results
    Compare(CompareArgs),
    /// Export dated metrics logs to CSV with grouped summaries
    Export(ExportArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    /// Print to the console only
    Text,
    /// Print and also write a dated report file
    File,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Which comparison to run
    #[arg(long, value_enum, default_value = "methods")]
    phase: Phase,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputMode,

    /// Use a specific dataset for one entry (NAME=PATH); may be repeated
    #[arg(long = "file", value_parser = parse_named_path)]
    files: Vec<(String, PathBuf)>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long, value_enum)]
    category: ExportCategory,

    /// Export a single day (YYYY-MM-DD)
    #[arg(long, conflicts_with = "days")]
    date: Option<chrono::NaiveDate>,

    /// Trailing window in days (default from config)
    #[arg(long)]
    days: Option<u32>,

    /// Output directory (default from config)
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_named_path(s: &str) -> std::result::Result<(String, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{}'", s))?;
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{}'", s));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // Process-wide log setup happens once, here; RUST_LOG overrides the configured level.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    match cli.command {
        Commands::Compare(args) => run_compare(&config, args),
        Commands::Export(args) => run_export(&config, args),
    }
}

fn run_compare(config: &Config, args: CompareArgs) -> Result<()> {
    let (names, base) = match args.phase {
        Phase::Methods => (&config.compare.methods, &config.paths.method_results_dir),
        Phase::Models => (&config.compare.models, &config.paths.model_results_dir),
    };
    let explicit: HashMap<String, PathBuf> = args.files.into_iter().collect();
    for name in explicit.keys() {
        if !names.contains(name) {
            log::warn!("--file given for '{}', which is not in the {} list", name, args.phase.noun());
        }
    }

    log::info!("Comparing {} {}s from {}", names.len(), args.phase.noun(), base.display());

    let mut aggregates: HashMap<String, MethodAggregate> = HashMap::new();
    let mut statuses: HashMap<String, MethodStatus> = HashMap::new();
    for name in names {
        let data = loader::load_method(base, name, explicit.get(name).map(PathBuf::as_path));
        if let Some(rated) = &data.rated {
            aggregates.insert(name.clone(), aggregate(&rated.records));
        }
        statuses.insert(name.clone(), data.status());
    }

    let weights = config.scoring_weights()?;
    let comparison = report::compare(args.phase, names, &aggregates, &statuses, &weights);

    let now = Local::now().naive_local();
    let text = report::render(&comparison, now);
    print!("{}", text);

    if args.output == OutputMode::File {
        let path = report::write_report(&config.paths.reports_dir, args.phase, now.date(), &text)
            .context("Failed to write comparison report")?;
        println!("\nReport saved to {}", path.display());
    }

    Ok(())
}

fn run_export(config: &Config, args: ExportArgs) -> Result<()> {
    let selector = match (args.date, args.days) {
        (Some(date), _) => DateSelector::Exact(date),
        (None, Some(0)) => anyhow::bail!("--days must be greater than 0"),
        (None, Some(days)) => DateSelector::Trailing(days),
        (None, None) => DateSelector::Trailing(config.export.default_days),
    };

    let request = ExportRequest {
        metrics_root: config.paths.metrics_dir.clone(),
        out_dir: args.out.unwrap_or_else(|| config.paths.export_dir.clone()),
        category: args.category,
        selector,
        today: Local::now().date_naive(),
    };

    let outcome = export::run_export(&request)
        .with_context(|| format!("Export of {} metrics failed", args.category.slug()))?;

    println!("\n=== {} Metrics Export ({}) ===\n", args.category.slug(), request.prefix());
    if outcome.records == 0 {
        println!("No records found (0 records exported).");
        return Ok(());
    }

    println!("Files read:     {}", outcome.files_read.len());
    for path in &outcome.fail_open {
        println!("  included with unparsable date: {}", path.display());
    }
    println!("Records:        {}", outcome.records);
    for table in &outcome.summaries {
        println!("\nBy {}:\n", table.group);
        println!("{}", render_table(table));
    }
    for reason in &outcome.aborted {
        println!("\nSkipped summary: {}", reason);
    }
    println!("\nWritten:");
    for path in &outcome.written {
        println!("  {}", path.display());
    }
    println!();

    Ok(())
}
