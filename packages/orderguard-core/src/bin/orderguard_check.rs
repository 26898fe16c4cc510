//! Orderguard CLI
//!
//! Checks call-order rules on program IR files produced by a front-end.
//!
//! # Usage
//!
//! ```bash
//! # Built-in Cipher protocol, text report
//! orderguard-check units/*.json
//!
//! # Custom protocols, strict policy, JSON report
//! orderguard-check --protocol rules/digest.yaml --fail-on-potential --format json unit.json
//!
//! # Order rule inline
//! orderguard-check --order "Lock=acquire, release" unit.json
//! ```
//!
//! Exit codes: 0 = all units pass, 1 = some unit fails, 2 = input error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use orderguard_core::config::Preset;
use orderguard_core::{
    verify_batch, BatchReport, OrderguardError, PotentialPolicy, Program, ProtocolRegistry,
    Result, Verdict, VerifierConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orderguard-check")]
#[command(about = "Typestate verifier for call-order rules on API handles", long_about = None)]
struct Cli {
    /// Program IR files (JSON)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Protocol definition file (YAML, one mapping or a list); repeatable
    #[arg(short, long)]
    protocol: Vec<PathBuf>,

    /// Order rule `NAME=EXPR`, e.g. "Lock=acquire, release"; repeatable
    #[arg(long)]
    order: Vec<String>,

    /// Verifier configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration preset (fast, balanced, thorough)
    #[arg(long)]
    preset: Option<String>,

    /// Per-unit timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Report handles left outside an accepting state
    #[arg(long)]
    check_termination: bool,

    /// Treat potential violations as failures
    #[arg(long)]
    fail_on_potential: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(Verdict::Pass) => ExitCode::SUCCESS,
        Ok(Verdict::Fail) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<Verdict> {
    let config = load_config(cli)?;
    let registry = load_registry(cli)?;
    info!(protocols = ?registry.names(), "protocols loaded");

    let units = cli
        .files
        .iter()
        .map(Program::from_file)
        .collect::<Result<Vec<_>>>()?;

    let report = verify_batch(&units, &registry, &config);
    match cli.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.verdict())
}

fn load_config(cli: &Cli) -> Result<VerifierConfig> {
    let mut config = match (&cli.config, &cli.preset) {
        (Some(path), _) => VerifierConfig::from_yaml_file(path)?,
        (None, Some(name)) => VerifierConfig::preset(Preset::from_str(name)?),
        (None, None) => VerifierConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    if cli.check_termination {
        config = config.with_termination_check(true);
    }
    if cli.fail_on_potential {
        config = config.with_potential_policy(PotentialPolicy::Fail);
    }
    config.validate()?;
    Ok(config)
}

fn load_registry(cli: &Cli) -> Result<ProtocolRegistry> {
    let mut registry = ProtocolRegistry::with_builtin();
    for path in &cli.protocol {
        let text = std::fs::read_to_string(path)?;
        registry.load_yaml(&text)?;
    }
    for rule in &cli.order {
        let (name, expr) = rule.split_once('=').ok_or_else(|| {
            OrderguardError::protocol(format!("order rule '{}' is not NAME=EXPR", rule))
        })?;
        registry.register_order(name.trim(), expr.trim())?;
    }
    Ok(registry)
}

fn print_text(report: &BatchReport) {
    for unit in &report.reports {
        let marker = if unit.result.incomplete {
            " (incomplete)"
        } else {
            ""
        };
        println!("{} {}{}", unit.verdict, unit.unit, marker);
        for violation in &unit.result.violations {
            println!("  {}", violation);
        }
    }
    let summary = &report.summary;
    println!(
        "{} unit(s): {} definite, {} potential, {} failed, {} incomplete ({} ms)",
        summary.units,
        summary.definite,
        summary.potential,
        summary.failed_units,
        summary.incomplete_units.len(),
        summary.elapsed_ms
    );
}
