use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use oracle::{CheckOutcome, InvariantChecker, check};
use oracle_checkers::{
    BoundedOverwriteChecker, Currency, DifferentialChecker, DocumentParser, JsonParser, Money,
    OverwriteInput, PrefixContainmentChecker, RoundTripChecker, RouteTable, SplitInput,
    YamlParser, normalize_path, overwrite_chars,
};
use oracle_stateful::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oracle")]
#[command(about = "Replay oracle inputs and run stateless invariant checkers", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one operation sequence against a fresh in-memory user service
    Replay {
        /// Comma-separated hex bytes, e.g. 00,01,03
        #[arg(long, default_value = "")]
        ops: String,

        /// Resource key (the user's email)
        #[arg(long)]
        key: String,

        #[arg(long)]
        name: String,

        /// Contact number submitted on create
        #[arg(long)]
        value1: String,

        /// Contact number submitted on update
        #[arg(long)]
        value2: String,

        /// Treat every mismatch as a divergence
        #[arg(long)]
        strict: bool,

        /// Read the key back after the last operation
        #[arg(long)]
        verify: bool,

        /// Misbehaviours to inject into the service
        #[arg(long, value_enum)]
        quirk: Vec<QuirkArg>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Split an amount into parts and check the parts add back up
    Split {
        /// Amount in minor units
        #[arg(long, allow_hyphen_values = true)]
        amount: i64,

        #[arg(long, allow_hyphen_values = true)]
        parts: i64,

        #[arg(long, default_value = "GBP")]
        currency: String,
    },
    /// Match a path against literal route patterns
    Route {
        #[arg(long)]
        path: String,

        /// Route pattern to register (defaults to the built-in table)
        #[arg(long)]
        pattern: Vec<String>,
    },
    /// Overwrite the first characters of a string
    Overwrite {
        #[arg(long)]
        text: String,

        #[arg(long)]
        fill: char,

        #[arg(long, allow_hyphen_values = true)]
        count: i64,
    },
    /// Parse a file as both JSON and YAML and compare the results
    Diff {
        /// File to parse
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QuirkArg {
    SilentUpdate,
    DeleteMissingOk,
}

impl From<QuirkArg> for Quirk {
    fn from(arg: QuirkArg) -> Self {
        match arg {
            QuirkArg::SilentUpdate => Quirk::SilentUpdateOnMissing,
            QuirkArg::DeleteMissingOk => Quirk::DeleteMissingOk,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let passed = match cli.command {
        Commands::Replay {
            ops,
            key,
            name,
            value1,
            value2,
            strict,
            verify,
            quirk,
            json,
        } => {
            let seeds = SeedValues::new(key, name, value1, value2);
            let quirks: Vec<Quirk> = quirk.into_iter().map(Quirk::from).collect();
            replay(&ops, &seeds, strict, verify, quirks, json)?
        }
        Commands::Split {
            amount,
            parts,
            currency,
        } => split(amount, parts, &currency)?,
        Commands::Route { path, pattern } => route(&path, &pattern)?,
        Commands::Overwrite { text, fill, count } => overwrite(text, fill, count),
        Commands::Diff { file } => diff(&file)?,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_ops(ops: &str) -> Result<Vec<u8>> {
    ops.split(',')
        .map(str::trim)
        .filter(|byte| !byte.is_empty())
        .map(|byte| {
            let digits = byte.strip_prefix("0x").unwrap_or(byte);
            u8::from_str_radix(digits, 16).with_context(|| format!("Invalid hex byte '{}'", byte))
        })
        .collect()
}

fn replay(
    ops: &str,
    seeds: &SeedValues,
    strict: bool,
    verify: bool,
    quirks: Vec<Quirk>,
    json: bool,
) -> Result<bool> {
    let raw = parse_ops(ops)?;

    let mut config = OracleConfig::from_env().context("Invalid ORACLE_* environment")?;
    if strict {
        config = config.with_policy(DivergencePolicy::Strict);
    }
    if verify {
        config = config.with_final_state_check(true);
    }
    debug!(?config, bytes = raw.len(), "replaying");

    let service = InMemoryUserService::with_quirks(quirks);
    let mut adapter = MemoryAdapter::new(service);
    let engine = OracleEngine::new(config);
    let verdict = engine.run_input(&raw, seeds, 0, &mut adapter);

    if json {
        let rendered =
            serde_json::to_string_pretty(&verdict).context("Failed to serialize verdict")?;
        println!("{}", rendered);
        return Ok(!verdict.is_failure());
    }

    match &verdict {
        Verdict::Passed(summary) => {
            println!("{} {}", "✓".green(), "Run passed".bold());
            println!("  {}: {}", "Key".bold(), summary.key);
            println!("  {}: {}", "Operations".bold(), summary.operations_executed);
            if summary.resynchronized > 0 {
                println!("  {}: {}", "Resynchronized".bold(), summary.resynchronized);
            }
            println!("  {}: {}", "Final state".bold(), summary.final_state);
            if let Some(trace) = &summary.trace
                && !trace.is_empty()
            {
                println!();
                println!("{}", trace.to_string().bright_black());
            }
        }
        Verdict::Discarded(reason) => {
            println!("{} {}", "○".yellow(), format!("Input discarded: {}", reason).yellow());
        }
        Verdict::Diverged(report) => {
            println!("{} {}", "✗".bright_red(), "Divergence found".bold().red());
            println!("{}", report);
        }
        Verdict::Faulted {
            operation_index,
            fault,
        } => {
            println!(
                "{} {}",
                "!".bright_red(),
                format!("Runtime fault at operation {}: {}", operation_index, fault).red()
            );
        }
    }

    Ok(!verdict.is_failure())
}

fn print_outcome(outcome: &CheckOutcome) -> bool {
    match outcome {
        CheckOutcome::Holds => {
            println!("{} {}", "✓".green(), "Property holds".bold());
            true
        }
        CheckOutcome::Discarded(reason) => {
            println!("{} {}", "○".yellow(), format!("Input discarded: {}", reason).yellow());
            true
        }
        CheckOutcome::Violated(violation) => {
            println!("{} {}", "✗".bright_red(), violation.to_string().red());
            false
        }
    }
}

fn split(amount: i64, parts: i64, currency: &str) -> Result<bool> {
    let currency: Currency = currency.parse()?;
    let input = SplitInput {
        amount,
        parts,
        currency,
    };

    if let Ok(shares) = Money::new(amount, currency).split(parts)
        && shares.len() <= 20
    {
        let rendered: Vec<String> = shares.iter().map(Money::to_string).collect();
        println!("  {}: {}", "Shares".bold(), rendered.join(", "));
    }

    Ok(print_outcome(&check(&RoundTripChecker, &input)))
}

fn route(path: &str, patterns: &[String]) -> Result<bool> {
    let table = if patterns.is_empty() {
        RouteTable::default()
    } else {
        RouteTable::with_patterns(patterns.iter().map(String::as_str))
            .context("Invalid route pattern")?
    };

    let normalized = normalize_path(path);
    println!("  {}: {}", "Normalized".bold(), normalized);
    match table.match_path(&normalized) {
        Some(pattern) => println!("  {}: {}", "Matched".bold(), pattern.cyan()),
        None => println!("  {}: {}", "Matched".bold(), "none".bright_black()),
    }

    let checker = PrefixContainmentChecker::new(table);
    Ok(print_outcome(&check(&checker, &path.to_string())))
}

fn overwrite(text: String, fill: char, count: i64) -> bool {
    if let Ok(count) = usize::try_from(count) {
        println!("  {}: {}", "Result".bold(), overwrite_chars(&text, fill, count));
    }
    let input = OverwriteInput { text, fill, count };
    print_outcome(&check(&BoundedOverwriteChecker::new(overwrite_chars), &input))
}

fn diff(file: &Path) -> Result<bool> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read '{}'", file.display()))?;
    if bytes.is_empty() {
        bail!("'{}' is empty", file.display());
    }

    let checker = DifferentialChecker::json_yaml();
    for (format, parsed) in [
        (JsonParser.format(), JsonParser.parse(&bytes)),
        (YamlParser.format(), YamlParser.parse(&bytes)),
    ] {
        match parsed {
            Ok(doc) => println!("  {}: {} top-level key(s)", format.bold(), doc.len()),
            Err(err) => println!("  {}: {}", format.bold(), err.message.bright_black()),
        }
    }

    debug!(checker = checker.name(), "comparing documents");
    Ok(print_outcome(&check(&checker, &bytes)))
}
