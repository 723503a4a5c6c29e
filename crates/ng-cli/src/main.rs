//! navgate CLI
//!
//! CLI tool for classifying navigations, compiling rule lists and replaying
//! recorded gate screen sessions.

mod perf_budget;
mod probe;
mod replay;
mod rules_file;

use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ng_compiler::Base;
use ng_core::{Gate, GateRules, LoadEvent};

#[derive(Parser)]
#[command(name = "ng-cli")]
#[command(about = "navgate navigation gate tools")]
struct Cli {
    /// Rule table JSON to use instead of the built-in tables
    #[arg(long, global = true)]
    rules: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify URLs before they load
    Classify {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Classify a completed load
    AfterLoad {
        /// URL the view ended up on
        #[arg(long)]
        url: String,

        /// Document title
        #[arg(long, default_value = "")]
        title: String,

        /// HTTP status code
        #[arg(long)]
        status: Option<u16>,

        /// The load failed below HTTP
        #[arg(long)]
        transport_error: bool,

        /// The view can navigate back
        #[arg(long)]
        can_go_back: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Compile rule lists into a rule table
    Compile {
        /// Input rule list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Output rule table file
        #[arg(short, long, default_value = "rules.json")]
        output: String,

        /// Start from empty tables instead of the built-in ones
        #[arg(long)]
        no_builtin: bool,
    },

    /// Validate a rule table
    Validate {
        /// Rule table file to validate
        #[arg(short, long)]
        input: String,
    },

    /// Run the connectivity probe once
    Probe {
        /// URL to probe
        #[arg(long)]
        url: String,

        /// Probe timeout in milliseconds
        #[arg(long, default_value_t = 3000)]
        timeout_ms: u64,
    },

    /// Replay a recorded screen session trace
    Replay {
        /// Trace JSON file
        #[arg(short, long)]
        input: String,

        /// Print JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },

    /// Check classification latency against budgets
    PerfBudget {
        /// Measured iterations over the sample set
        #[arg(long, default_value_t = 2000)]
        iterations: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rules = cli.rules.as_deref();
    let result = match cli.command {
        Commands::Classify { urls, json } => cmd_classify(rules, &urls, json),
        Commands::AfterLoad {
            url,
            title,
            status,
            transport_error,
            can_go_back,
            json,
        } => {
            let event = LoadEvent {
                url: &url,
                title: &title,
                status,
                transport_error,
                can_go_back,
            };
            cmd_after_load(rules, &event, json)
        }
        Commands::Compile {
            input,
            output,
            no_builtin,
        } => cmd_compile(&input, &output, no_builtin, cli.verbose > 0),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Probe { url, timeout_ms } => cmd_probe(&url, timeout_ms),
        Commands::Replay { input, json } => replay::run_replay(rules, &input, json),
        Commands::PerfBudget { iterations } => perf_budget::run_perf_budget(perf_budget::PerfBudgetOptions {
            rules_path: cli.rules.clone(),
            iterations,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
struct BeforeLoadReport<'a> {
    url: &'a str,
    verdict: &'static str,
    reason: &'static str,
}

#[derive(Serialize)]
struct AfterLoadReport<'a> {
    url: &'a str,
    verdict: &'static str,
    can_go_back: bool,
    causes: Vec<&'static str>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize report: {}", e))
}

fn cmd_classify(rules_path: Option<&str>, urls: &[String], json: bool) -> Result<(), String> {
    let rules = rules_file::load_rules(rules_path)?;
    let gate = Gate::new(&rules);

    let reports: Vec<BeforeLoadReport<'_>> = urls
        .iter()
        .map(|url| {
            let verdict = gate.classify_before_load(url);
            BeforeLoadReport {
                url: verdict.url,
                verdict: verdict.verdict.as_str(),
                reason: verdict.reason.as_str(),
            }
        })
        .collect();

    if json {
        println!("{}", to_json(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!("{:<8} {:<16} {}", report.verdict, report.reason, report.url);
    }
    Ok(())
}

fn cmd_after_load(rules_path: Option<&str>, event: &LoadEvent<'_>, json: bool) -> Result<(), String> {
    let rules = rules_file::load_rules(rules_path)?;
    let result = Gate::new(&rules).classify_after_load(event);

    let report = AfterLoadReport {
        url: event.url,
        verdict: result.verdict().as_str(),
        can_go_back: result.can_go_back,
        causes: result.causes.names(),
    };

    if json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    println!("Verdict:      {}", report.verdict);
    println!("Can go back:  {}", report.can_go_back);
    if !report.causes.is_empty() {
        println!("Causes:       {}", report.causes.join(", "));
    }
    Ok(())
}

fn cmd_compile(inputs: &[String], output: &str, no_builtin: bool, verbose: bool) -> Result<(), String> {
    let base = if no_builtin { Base::Empty } else { Base::Builtin };
    let (rules, summary) = rules_file::compile_rules(inputs, base, verbose)?;
    let totals = &summary.stats.totals;

    rules
        .validate()
        .map_err(|e| format!("Compiled rule table failed validation: {}", e))?;
    rules_file::write_rules(Path::new(output), &rules)?;

    println!("Compiled {} rule lists to '{}'", inputs.len(), output);
    println!("  Lines:    {}", summary.lines());
    println!(
        "  Entries:  {} -> {} (dedupe removed {}, {} cancelled by @@)",
        totals.before, totals.after, totals.deduped, totals.removed_entries
    );
    println!("  Table:    {} entries", rules.entry_count());
    println!("  Time:     {:.1}ms", summary.total_ms);

    Ok(())
}

fn cmd_validate(input: &str) -> Result<(), String> {
    let text = std::fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;

    let rules = GateRules::from_json(&text)
        .map_err(|e| format!("Invalid rule table: {}", e))?;

    println!("Rule table '{}' is valid", input);
    println!("  Schemes:          {}", rules.scheme_prefixes.len());
    println!("  Domains:          {}", rules.external_domains.len());
    println!("  Carve-outs:       {}", rules.carve_outs.len());
    println!(
        "  Internal service: {} labels, {} substrings",
        rules.internal_service.labels.len(),
        rules.internal_service.substrings.len()
    );
    println!(
        "  Failure signals:  {} url, {} title",
        rules.failure_url_signals.len(),
        rules.failure_title_signals.len()
    );

    Ok(())
}

fn cmd_probe(url: &str, timeout_ms: u64) -> Result<(), String> {
    use ng_core::ConnectivityProbe;

    let mut probe = probe::HttpProbe::new(url, Duration::from_millis(timeout_ms))?;
    match probe.is_reachable() {
        Ok(true) => println!("online: {} is reachable", url),
        Ok(false) => println!("offline: {} is unreachable", url),
        Err(e) => println!("offline: {}", e),
    }
    Ok(())
}
