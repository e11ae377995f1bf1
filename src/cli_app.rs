//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use asset_hygiene::assets::inventory::{AssetInventory, InventoryProvider};
use asset_hygiene::assets::model::AssetPath;
use asset_hygiene::assets::types::{TypeRegistry, TypeSystem};
use asset_hygiene::core::config::Config;
use asset_hygiene::core::errors::AhcError;
use asset_hygiene::core::store::FileConfigStore;
use asset_hygiene::logger::jsonl::{ActivityLog, EventType, JsonlConfig};
use asset_hygiene::rules::codec;
use asset_hygiene::rules::engine::NamingRuleEngine;
use asset_hygiene::rules::naming::RuleSet;
use asset_hygiene::scanner::actions::{ExecutionReport, MutationExecutor, PlanRecorder};
use asset_hygiene::scanner::checks::CheckId;
use asset_hygiene::scanner::orchestrator::ScanOrchestrator;

/// Asset hygiene checker: naming conventions, unused assets, stale redirectors.
#[derive(Debug, Parser)]
#[command(
    name = "ahc",
    author,
    version,
    about = "Asset Hygiene Checker - naming, reachability and redirector checks",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the inventory manifest to scan.
    #[arg(long, global = true, value_name = "PATH")]
    inventory: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scan the inventory and list findings.
    Scan(ScanArgs),
    /// Show (or apply) the actions a check would take.
    Plan(PlanArgs),
    /// List registered checks.
    Checks,
    /// Inspect or change the naming rules.
    Rules(RulesArgs),
    /// View configuration.
    Config(ConfigArgs),
    /// Generate shell completion scripts.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    /// Only report findings of this check (key or id).
    #[arg(long, value_name = "CHECK")]
    check: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct PlanArgs {
    /// Check whose fix to plan (key or id).
    #[arg(value_name = "CHECK")]
    check: String,
    /// Restrict to these asset paths (every flagged asset when omitted).
    #[arg(value_name = "ASSET")]
    paths: Vec<String>,
    /// Apply the plan to the inventory and write the manifest back.
    #[arg(long)]
    apply: bool,
}

#[derive(Debug, Clone, Args)]
struct RulesArgs {
    /// Rules operation to run.
    #[command(subcommand)]
    command: Option<RulesCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum RulesCommand {
    /// Print the active rules in match order.
    Show,
    /// Replace the stored rules with the built-in defaults.
    Reset,
    /// Write the stored rule document to a file (stdout when omitted).
    Export(ExportArgs),
    /// Replace the stored rules with a rule document.
    Import(ImportArgs),
}

#[derive(Debug, Clone, Args)]
struct ExportArgs {
    /// Destination file.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ImportArgs {
    /// Rule document to import.
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<AhcError> for CliError {
    fn from(err: AhcError) -> Self {
        match err {
            AhcError::InvalidConfig { .. }
            | AhcError::MissingConfig { .. }
            | AhcError::ConfigParse { .. }
            | AhcError::InventoryParse { .. }
            | AhcError::UnknownAsset { .. }
            | AhcError::UnknownCheck { .. } => Self::User(err.to_string()),
            AhcError::AlreadyStarted => Self::Internal(err.to_string()),
            AhcError::Serialization { .. }
            | AhcError::Mutation { .. }
            | AhcError::Io { .. }
            | AhcError::Runtime { .. } => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Scan(args) => run_scan(cli, args),
        Command::Plan(args) => run_plan(cli, args),
        Command::Checks => run_checks(cli),
        Command::Rules(args) => run_rules(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── session wiring ────────────────────

/// Everything a command needs, wired from the effective config.
struct Session {
    config: Config,
    inventory_path: PathBuf,
    inventory: Arc<AssetInventory>,
    engine: Arc<NamingRuleEngine>,
    log: ActivityLog,
}

impl Session {
    /// Open config, activity log, settings store and inventory. A missing
    /// manifest is an error only when `require_inventory` is set; otherwise
    /// the engine type hierarchy stands in for it.
    fn open(cli: &Cli, require_inventory: bool) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let log = ActivityLog::open(JsonlConfig::for_path(&config.paths.activity_log));

        let inventory_path = cli
            .inventory
            .clone()
            .unwrap_or_else(|| config.paths.inventory.clone());
        let inventory = if inventory_path.exists() {
            AssetInventory::load(&inventory_path)?
        } else if require_inventory {
            return Err(CliError::User(format!(
                "inventory manifest not found: {}",
                inventory_path.display()
            )));
        } else {
            AssetInventory::with_types(Arc::new(TypeRegistry::with_engine_types()), Vec::new())
        };
        let inventory = Arc::new(inventory);

        let store = Arc::new(FileConfigStore::open(config.store.active_file())?);
        let types: Arc<dyn TypeSystem> = inventory.types();
        let engine = NamingRuleEngine::new(store, types, &config.rules, log.clone());

        Ok(Self {
            config,
            inventory_path,
            inventory,
            engine,
            log,
        })
    }

    /// Orchestrator over this session's inventory, with the first scan done.
    fn orchestrator(&self) -> Result<Arc<ScanOrchestrator>, CliError> {
        let provider: Arc<dyn InventoryProvider> = self.inventory.clone();
        let orchestrator = ScanOrchestrator::new(
            provider,
            Arc::clone(&self.engine),
            &self.config.scan,
            self.log.clone(),
        )?;
        orchestrator.start()?;
        Ok(orchestrator)
    }
}

fn resolve_check(orchestrator: &ScanOrchestrator, name: &str) -> Result<CheckId, CliError> {
    orchestrator.find_check(name).ok_or_else(|| {
        let known: Vec<&str> = orchestrator.checks().map(|(_, info)| info.key).collect();
        CliError::User(format!(
            "unknown check {name:?} (expected one of: {})",
            known.join(", ")
        ))
    })
}

// ──────────────────── scan / plan / checks ────────────────────

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let session = Session::open(cli, true)?;
    let orchestrator = session.orchestrator()?;
    let only = args
        .check
        .as_deref()
        .map(|name| resolve_check(&orchestrator, name))
        .transpose()?;

    let keys: Vec<(CheckId, &'static str)> = orchestrator
        .checks()
        .map(|(id, info)| (id, info.key))
        .collect();
    let key_of = |id: CheckId| {
        keys.iter()
            .find(|(known, _)| *known == id)
            .map_or("unknown", |(_, key)| *key)
    };

    let results = orchestrator.scan_results();
    let mut rows = Vec::new();
    for entry in results.iter() {
        for (id, finding) in &entry.findings {
            if only.is_some_and(|wanted| wanted != *id) {
                continue;
            }
            rows.push((entry, *id, finding.as_str()));
        }
    }

    match output_mode(cli) {
        OutputMode::Human => {
            println!(
                "{}\n  Scanned: {} assets under {}\n  Findings: {}\n",
                "Asset Hygiene Scan".bold(),
                orchestrator.assets_scanned(),
                session.config.scan.namespace,
                rows.len(),
            );
            if rows.is_empty() {
                println!("  No findings.");
            } else {
                println!("  {:<12}  {:<50}  {}", "Check", "Asset", "Detail");
                println!("  {}", "-".repeat(90));
                for (entry, id, finding) in &rows {
                    let key = key_of(*id);
                    let label = match key {
                        "unused" => key.red(),
                        "naming" => key.yellow(),
                        _ => key.cyan(),
                    };
                    println!(
                        "  {:<12}  {:<50}  {}",
                        label,
                        entry.path().as_str(),
                        finding
                    );
                }
            }
        }
        OutputMode::Json => {
            let findings: Vec<Value> = rows
                .iter()
                .map(|(entry, id, finding)| {
                    json!({
                        "path": entry.path().as_str(),
                        "name": entry.asset.name,
                        "type": entry.asset.asset_type.as_str(),
                        "check": key_of(*id),
                        "check_id": id.0,
                        "finding": finding,
                    })
                })
                .collect();
            let payload = json!({
                "command": "scan",
                "namespace": session.config.scan.namespace,
                "assets_scanned": orchestrator.assets_scanned(),
                "assets_flagged": results.len(),
                "rule_count": session.engine.rules().len(),
                "findings": findings,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_plan(cli: &Cli, args: &PlanArgs) -> Result<(), CliError> {
    let session = Session::open(cli, true)?;
    let orchestrator = session.orchestrator()?;
    let check = resolve_check(&orchestrator, &args.check)?;
    let paths: Vec<AssetPath> = args.paths.iter().map(AssetPath::new).collect();

    let recorder = PlanRecorder::new();
    let report = if args.apply {
        let executor: &dyn MutationExecutor = session.inventory.as_ref();
        let report = orchestrator.request_check_execution(check, &paths, executor)?;
        session.inventory.save(&session.inventory_path)?;
        report
    } else {
        orchestrator.request_check_execution(check, &paths, &recorder)?
    };
    let actions = recorder.into_actions();

    match output_mode(cli) {
        OutputMode::Human => {
            let verb = if args.apply { "Applied" } else { "Planned" };
            println!("{} {} fix", verb.bold(), report.check);
            if !args.apply {
                for action in &actions {
                    println!("  {}", serde_json::to_string(action)?);
                }
            }
            print_report_human(&report);
            if args.apply {
                println!("  Inventory written to {}", session.inventory_path.display());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "plan",
                "check": report.check,
                "applied": args.apply,
                "actions": actions,
                "report": report,
            });
            write_json_line(&payload)?;
        }
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} of {} assets failed",
            report.failed.len(),
            report.failed.len() + report.succeeded.len()
        )))
    }
}

fn print_report_human(report: &ExecutionReport) {
    println!("  Succeeded: {}", report.succeeded.len());
    for failure in &report.failed {
        println!(
            "  {} {} {}",
            "FAILED".red(),
            failure.path.as_str(),
            failure.message
        );
    }
}

fn run_checks(cli: &Cli) -> Result<(), CliError> {
    let session = Session::open(cli, false)?;
    let provider: Arc<dyn InventoryProvider> = session.inventory.clone();
    let orchestrator = ScanOrchestrator::new(
        provider,
        Arc::clone(&session.engine),
        &session.config.scan,
        ActivityLog::disabled(),
    )?;

    match output_mode(cli) {
        OutputMode::Human => {
            for (id, info) in orchestrator.checks() {
                println!("  {id:>2}  {:<12} {}", info.key.bold(), info.heading);
                println!("      filter: {}  apply-all: {}", info.filter_name, info.apply_all_label);
            }
        }
        OutputMode::Json => {
            let checks: Vec<Value> = orchestrator
                .checks()
                .map(|(id, info)| {
                    json!({
                        "id": id.0,
                        "key": info.key,
                        "heading": info.heading,
                        "tooltip": info.tooltip,
                        "filter_name": info.filter_name,
                        "apply_all_label": info.apply_all_label,
                        "style": info.style,
                    })
                })
                .collect();
            write_json_line(&json!({ "command": "checks", "checks": checks }))?;
        }
    }
    Ok(())
}

// ──────────────────── rules ────────────────────

fn run_rules(cli: &Cli, args: &RulesArgs) -> Result<(), CliError> {
    let session = Session::open(cli, false)?;
    match &args.command {
        None | Some(RulesCommand::Show) => {
            let rules = session.engine.rules();
            emit_rules(cli, "rules show", &rules)
        }
        Some(RulesCommand::Reset) => {
            session.engine.reset_to_baseline()?;
            let rules = session.engine.rules();
            emit_rules(cli, "rules reset", &rules)
        }
        Some(RulesCommand::Export(export)) => {
            let rules = session.engine.rules();
            let document = rules_document(&rules)?;
            let pretty = serde_json::to_string_pretty(&document)?;
            match &export.file {
                Some(path) => {
                    write_text_file(path, &pretty)?;
                    match output_mode(cli) {
                        OutputMode::Human => {
                            println!("Exported {} rules to {}", rules.len(), path.display());
                        }
                        OutputMode::Json => write_json_line(&json!({
                            "command": "rules export",
                            "path": path.to_string_lossy(),
                            "rule_count": rules.len(),
                        }))?,
                    }
                }
                None => println!("{pretty}"),
            }
            Ok(())
        }
        Some(RulesCommand::Import(import)) => run_rules_import(cli, &session, &import.file),
    }
}

fn run_rules_import(cli: &Cli, session: &Session, file: &Path) -> Result<(), CliError> {
    let text = fs::read_to_string(file)
        .map_err(|e| CliError::User(format!("failed to read {}: {e}", file.display())))?;
    let decoded = codec::decode(&text, session.engine.types().as_ref());
    for dropped in &decoded.dropped {
        session.log.warn(EventType::RuleDropped, |e| {
            e.with_path(file.to_string_lossy())
                .with_details(dropped.reason.to_string())
        });
    }

    if decoded.rules.is_empty() && !decoded.dropped.is_empty() {
        return Err(CliError::User(format!(
            "no usable rules in {} ({} entries dropped)",
            file.display(),
            decoded.dropped.len()
        )));
    }

    let imported = decoded.rules.len();
    session.engine.replace_rules(decoded.rules)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("Imported {imported} rules from {}", file.display());
            for dropped in &decoded.dropped {
                let at = dropped
                    .index
                    .map_or_else(|| "document".to_string(), |idx| format!("entry {idx}"));
                println!("  {} {at}: {}", "dropped".yellow(), dropped.reason);
            }
        }
        OutputMode::Json => {
            let dropped: Vec<Value> = decoded
                .dropped
                .iter()
                .map(|d| json!({ "index": d.index, "reason": d.reason.to_string() }))
                .collect();
            write_json_line(&json!({
                "command": "rules import",
                "path": file.to_string_lossy(),
                "imported": imported,
                "dropped": dropped,
            }))?;
        }
    }
    Ok(())
}

/// Encoded rules as a JSON value (`null` for an empty set).
fn rules_document(rules: &RuleSet) -> Result<Value, CliError> {
    let text = codec::encode(rules)?;
    if text.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

fn emit_rules(cli: &Cli, command: &str, rules: &RuleSet) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            println!("  {:<3}  {:<28}  {:<20}  {}", "#", "Type", "Format", "When");
            println!("  {}", "-".repeat(80));
            for (idx, rule) in rules.iter().enumerate() {
                let when: Vec<String> = rule
                    .predicates
                    .iter()
                    .map(|p| format!("{} == {}", p.property, p.value))
                    .collect();
                println!(
                    "  {:<3}  {:<28}  {:<20}  {}",
                    idx,
                    rule.target.short_name(),
                    format!("{}<Name>{}", rule.prefix, rule.suffix),
                    when.join(" && ")
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": command,
                "rule_count": rules.len(),
                "rules": rules_document(rules)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", config.to_toml()?);
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "hash": config.stable_hash()?,
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ──────────────────── output helpers ────────────────────

fn write_text_file(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("AHC_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        Some("auto") | None => fallback,
        Some(_) => fallback,
    }
}
