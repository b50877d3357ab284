//! Rulemap CLI - compile mapping rules to pipeline JSON
//!
//! # Main Commands
//!
//! ```bash
//! rulemap translate rules.json               # Compile to pipeline JSON (stdout)
//! rulemap translate rules.json -o out.json   # Compile to a file
//! rulemap batch a.json b.json --out-dir out  # Compile many files concurrently
//! rulemap validate rules.json                # Validate and print reordered rules
//! ```
//!
//! # Reference Commands
//!
//! ```bash
//! rulemap elements                           # Supported action types and operators
//! rulemap example                            # Example ruleset
//! ```

use clap::{Parser, Subcommand};
use rulemap::logs::{log_error, log_info, log_info_indent, log_success, set_quiet};
use rulemap::pipeline::{
    compile_batch, compile_file, load_catalog, validate_imported_rules, validate_rule,
    BatchProgress,
};
use rulemap::validation::validate_group_definitions;
use rulemap::{
    CompileError, CompilerConfig, ElementType, OperatorType, Payload, ServiceError,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rulemap")]
#[command(about = "Compile event mapping rules into processing pipeline JSON", long_about = None)]
struct Cli {
    /// Do not echo progress logs to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PhaseArgs {
    /// Entry phase name (default: RULEMAP_ENTRY_PHASE or snmp_map)
    #[arg(long)]
    entry_phase: Option<String>,

    /// Run phase name (default: RULEMAP_RUN_PHASE or phase_1)
    #[arg(long)]
    run_phase: Option<String>,

    /// Publish phase name (default: RULEMAP_PUBLISH_PHASE or map_publish)
    #[arg(long)]
    publish_phase: Option<String>,

    /// Schema catalog file or directory (default: RULEMAP_SCHEMA_CATALOG)
    #[arg(short, long)]
    catalog: Option<PathBuf>,
}

impl PhaseArgs {
    fn into_config(self) -> CompilerConfig {
        let mut config = CompilerConfig::from_env();
        if let Some(phase) = self.entry_phase {
            config = config.with_entry_phase(phase);
        }
        if let Some(phase) = self.run_phase {
            config = config.with_run_phase(phase);
        }
        if let Some(phase) = self.publish_phase {
            config = config.with_publish_phase(phase);
        }
        if let Some(path) = self.catalog {
            config = config.with_catalog(path);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate rules and print them with dependencies reordered
    Validate {
        /// Input rule or ruleset JSON
        input: PathBuf,

        /// Schema catalog file or directory
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Compile a rule or ruleset to pipeline JSON
    Translate {
        /// Input rule or ruleset JSON
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        phases: PhaseArgs,
    },

    /// Compile several files concurrently
    Batch {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory receiving `<name>.pipeline.json` files
        #[arg(short = 'd', long)]
        out_dir: PathBuf,

        #[command(flatten)]
        phases: PhaseArgs,
    },

    /// Show supported action types and condition operators
    Elements,

    /// Show an example ruleset
    Example,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Validate { input, catalog } => cmd_validate(&input, catalog),

        Commands::Translate {
            input,
            output,
            pretty,
            phases,
        } => cmd_translate(&input, output.as_deref(), pretty, phases.into_config()),

        Commands::Batch {
            inputs,
            out_dir,
            phases,
        } => cmd_batch(inputs, &out_dir, phases.into_config()).await,

        Commands::Elements => cmd_elements(),

        Commands::Example => cmd_example(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_validate(input: &Path, catalog: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CompilerConfig::from_env();
    if let Some(path) = catalog {
        config = config.with_catalog(path);
    }
    let catalog = load_catalog(&config)?;

    log_info(format!("Validating: {}", input.display()));
    let validated = match rulemap::parse_file(input)? {
        Payload::Rule(rule) => validate_rule(&rule).map(|rule| serde_json::to_value(&rule)),
        Payload::Rules(rules) => validate_imported_rules(&rules, catalog.as_deref())
            .and_then(|rules| validate_group_definitions(&rules).map(|()| rules))
            .map(|rules| serde_json::to_value(&rules)),
    };

    match validated {
        Ok(value) => {
            log_success("Rules are valid");
            println!("{}", serde_json::to_string_pretty(&value?)?);
            Ok(())
        }
        Err(errors) => {
            print_errors(&errors)?;
            std::process::exit(1);
        }
    }
}

fn cmd_translate(
    input: &Path,
    output: Option<&Path>,
    pretty: bool,
    config: CompilerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(&config)?;

    match compile_file(input, &config, catalog.as_deref()) {
        Ok(json) => {
            let json = if pretty {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                serde_json::to_string_pretty(&value)?
            } else {
                json
            };
            write_output(&json, output)
        }
        Err(CompileError::Rejected(errors)) => {
            print_errors(&errors)?;
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_batch(
    inputs: Vec<PathBuf>,
    out_dir: &Path,
    config: CompilerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(out_dir).await?;
    let catalog = load_catalog(&config)?;

    log_info(format!("Compiling {} file(s)", inputs.len()));
    let mut progress = BatchProgress::new(&inputs);
    let watcher = tokio::spawn(async move {
        while let Some((done, _)) = progress.next().await {
            log_info_indent(format!("{}/{} done", done, progress.total()), 1);
        }
    });

    let results = compile_batch(inputs.clone(), config, catalog).await;
    if results.iter().any(|r| matches!(r, Err(CompileError::Task(_)))) {
        // a panicked task never reports, so the count cannot complete
        watcher.abort();
    } else {
        let _ = watcher.await;
    }

    let mut failed = 0;
    for (input, result) in inputs.iter().zip(results) {
        match result {
            Ok(json) => {
                let name = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("rules");
                let path = out_dir.join(format!("{}.pipeline.json", name));
                tokio::fs::write(&path, json).await?;
                log_success(format!("{} -> {}", input.display(), path.display()));
            }
            // already reported by the batch
            Err(_) => failed += 1,
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} file(s) failed", failed, inputs.len()).into());
    }
    Ok(())
}

fn cmd_elements() -> Result<(), Box<dyn std::error::Error>> {
    println!("Action types:");
    for element in ElementType::ACTIONS {
        println!("  {}", element.display_name());
    }

    println!("\nCondition operators:");
    for operator in OperatorType::ALL {
        let class = operator.filter_class();
        let mut name = class[..1].to_lowercase();
        name.push_str(&class[1..]);
        println!("  {:<12} -> {}", name, operator.element_type());
    }

    println!("\nCondition groups:");
    println!("  All          -> And");
    println!("  Any          -> Or");
    Ok(())
}

fn cmd_example() -> Result<(), Box<dyn std::error::Error>> {
    let example = json!({
        "version": "4.1",
        "eventType": "syslogFields",
        "rules": {
            "set-version": {
                "description": "Normalize version and build the event id",
                "actions": [
                    { "actionType": "copy", "target": "event.commonEventHeader.version", "from": { "value": "4.1" } },
                    { "actionType": "concat", "target": "event.commonEventHeader.eventId",
                      "from": { "values": [{ "value": "${event.commonEventHeader.sourceName}" }, { "value": "_" }, { "value": "${event.commonEventHeader.sequence}" }] } },
                    { "actionType": "copy", "target": "event.commonEventHeader.sourceName",
                      "from": { "value": "${event.syslogFields.syslogMsg}", "regex": "^([^:]*):.*" } }
                ],
                "condition": {
                    "type": "All",
                    "children": [
                        { "left": "${event.commonEventHeader.domain}", "operator": "notEqual", "right": ["fault", "heartbeat"] },
                        { "left": "${event.syslogFields.syslogMsg}", "operator": "contains", "right": [":"] }
                    ]
                }
            }
        }
    });
    println!("{}", serde_json::to_string_pretty(&example)?);
    Ok(())
}

fn print_errors(errors: &[ServiceError]) -> Result<(), Box<dyn std::error::Error>> {
    log_error(format!("{} error(s) found", errors.len()));
    println!("{}", serde_json::to_string_pretty(errors)?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            log_success(format!("Output written to: {}", p.display()));
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
