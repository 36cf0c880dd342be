//! Command-line interface module for taxon.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing and validation
//! - Organization orchestration and reporting
//! - Scheduled re-runs
//! - Rule and settings management through a [`ConfigStore`]

use clap::{ArgAction, Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, ConfigStore, FileConfigStore};
use crate::file_organizer::{
    ConflictPolicy, FileOutcome, OrganizeError, OrganizeOptions, Organizer, ParsePolicyError,
    RunStats,
};
use crate::output::OutputFormatter;
use crate::rules::{Rule, RuleKind};
use crate::schedule::{ScheduleError, Scheduler};

/// Errors surfaced to the user by a command. Any of these ends the process
/// with a non-zero exit status.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Policy(#[from] ParsePolicyError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("no rule named '{0}'")]
    RuleNotFound(String),
    #[error("failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "taxon")]
#[command(version, about = "Sort files into category folders using prioritized rules")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Diagnostic log level (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Organize the files of a folder into category subfolders
    Organize(OrganizeArgs),
    /// Organize a folder now and then again at a fixed interval
    Schedule(ScheduleArgs),
    /// Manage custom classification rules
    Rules {
        #[command(subcommand)]
        action: RulesCommand,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct OrganizeArgs {
    /// Folder to organize (defaults to the configured download path)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Only report what would be moved
    #[arg(short, long)]
    pub dry_run: bool,

    /// Conflict resolution: rename, skip or overwrite
    #[arg(short, long)]
    pub conflict: Option<ConflictPolicy>,

    /// Print the final counts as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Minutes between runs
    #[arg(short, long, default_value_t = 60)]
    pub interval: u64,

    /// Folder to organize (defaults to the configured download path)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Only report what would be moved
    #[arg(short, long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RulesCommand {
    /// List rules in evaluation order
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add a rule
    Add {
        #[arg(short, long)]
        name: String,
        /// keyword, regex or extension
        #[arg(short = 't', long = "type")]
        kind: RuleKind,
        #[arg(short, long)]
        pattern: String,
        /// Folder that matching files are moved into
        #[arg(short, long)]
        folder: String,
        /// Higher runs first
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i64,
        #[arg(long)]
        case_sensitive: bool,
    },
    /// Remove every rule with the given name
    Remove {
        #[arg(short, long)]
        name: String,
    },
    /// Remove all rules
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,
    /// Set the default folder to organize
    SetPath { path: PathBuf },
    /// Set the default conflict resolution
    SetConflict { policy: String },
    /// Make dry runs the default
    SetDryRun {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
}

/// Runs a parsed command line against the configuration file it names.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use taxon::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["taxon", "organize", "--path", "/tmp/downloads", "--dry-run"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), CliError> {
    let store = FileConfigStore::resolve(cli.config.as_deref());
    run_command(cli.command, &store)
}

/// Runs a command against an arbitrary store.
pub fn run_command(command: Command, store: &dyn ConfigStore) -> Result<(), CliError> {
    match command {
        Command::Organize(args) => organize(&args, store).map(|_| ()),
        Command::Schedule(args) => schedule(&args, store),
        Command::Rules { action } => manage_rules(action, store),
        Command::Config { action } => manage_config(action, store),
    }
}

/// Builds an organizer from the command-line overrides and stored settings.
///
/// Fails before any file is touched if the folder is missing or the conflict
/// resolution is not recognized.
fn build_organizer(
    path: Option<&Path>,
    dry_run: bool,
    conflict: Option<ConflictPolicy>,
    store: &dyn ConfigStore,
) -> Result<Organizer, CliError> {
    let config = store.load()?;
    let root = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.default_download_path.clone());
    let conflict_policy = match conflict {
        Some(policy) => policy,
        None => config.conflict_policy()?,
    };
    let options = OrganizeOptions {
        dry_run: dry_run || config.dry_run,
        conflict_policy,
    };

    Ok(Organizer::new(root, options)?.with_rules(config.rule_engine()))
}

/// Organizes one folder and reports the results.
pub fn organize(args: &OrganizeArgs, store: &dyn ConfigStore) -> Result<RunStats, CliError> {
    let organizer = build_organizer(args.path.as_deref(), args.dry_run, args.conflict, store)?;
    let dry_run = organizer.options().dry_run;

    if args.json {
        let stats = organizer.organize_files()?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(stats);
    }

    OutputFormatter::info(&format!(
        "Organizing contents of: {}",
        organizer.root().display()
    ));
    if dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }

    let files = organizer.discover_files()?;
    let pb = OutputFormatter::create_progress_bar(files.len() as u64);
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();

    let stats = organizer.organize_paths_with(&files, |outcome| {
        if let FileOutcome::Moved { category, .. } = outcome {
            *category_counts.entry(category.clone()).or_insert(0) += 1;
        }
        pb.println(OutputFormatter::outcome_line(outcome));
        pb.inc(1);
    });
    pb.finish_and_clear();

    OutputFormatter::category_table(&category_counts);
    OutputFormatter::run_summary(&stats, dry_run);

    if stats.errored > 0 {
        OutputFormatter::warning("Some files could not be organized. Please review errors above.");
    }
    if dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    }

    Ok(stats)
}

fn schedule(args: &ScheduleArgs, store: &dyn ConfigStore) -> Result<(), CliError> {
    let scheduler = Scheduler::new(args.interval)?;
    // Validate once up front so a bad path or policy fails immediately.
    let organizer = build_organizer(args.path.as_deref(), args.dry_run, None, store)?;
    let root = organizer.root().to_path_buf();

    scheduler.stop_on_ctrlc()?;
    OutputFormatter::info(&format!(
        "Scheduled organizing of {} every {} minute(s). Press Ctrl+C to stop.",
        root.display(),
        args.interval
    ));

    scheduler.run(|| -> Result<(), CliError> {
        // Reload settings each pass so rule edits apply without a restart.
        let organizer = build_organizer(Some(&root), args.dry_run, None, store)?;
        let stats = organizer.organize_files()?;
        OutputFormatter::plain(&format!(
            "[{}] moved {}, skipped {}, errors {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            stats.moved,
            stats.skipped,
            stats.errored
        ));
        Ok(())
    });

    OutputFormatter::info("Schedule stopped.");
    Ok(())
}

fn manage_rules(action: RulesCommand, store: &dyn ConfigStore) -> Result<(), CliError> {
    let mut config = store.load()?;
    let mut engine = config.rule_engine();

    match action {
        RulesCommand::List { json } => {
            let records = engine.to_records();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                OutputFormatter::rule_list(&records);
            }
            return Ok(());
        }
        RulesCommand::Add {
            name,
            kind,
            pattern,
            folder,
            priority,
            case_sensitive,
        } => {
            let rule = Rule::new(name.clone(), kind, pattern, folder)
                .with_priority(priority)
                .case_sensitive(case_sensitive);
            engine.add_rule(rule);
            config.set_rules(&engine);
            store.save(&config)?;
            OutputFormatter::success(&format!("Rule '{}' added", name));
        }
        RulesCommand::Remove { name } => {
            if !engine.remove_rule(&name) {
                return Err(CliError::RuleNotFound(name));
            }
            config.set_rules(&engine);
            store.save(&config)?;
            OutputFormatter::success(&format!("Rule '{}' removed", name));
        }
        RulesCommand::Clear => {
            engine.clear();
            config.set_rules(&engine);
            store.save(&config)?;
            OutputFormatter::success("All rules cleared");
        }
    }
    Ok(())
}

fn manage_config(action: ConfigCommand, store: &dyn ConfigStore) -> Result<(), CliError> {
    let mut config = store.load()?;

    let message = match action {
        ConfigCommand::Show => {
            OutputFormatter::header("CONFIGURATION");
            OutputFormatter::plain(&format!(
                "  Download folder:      {}",
                config.default_download_path.display()
            ));
            OutputFormatter::plain(&format!(
                "  Conflict resolution:  {}",
                config.conflict_resolution
            ));
            OutputFormatter::plain(&format!("  Dry run by default:   {}", config.dry_run));
            OutputFormatter::plain(&format!("  Custom rules:         {}", config.rules.len()));
            OutputFormatter::plain(&format!("  Config file:          {}", store.location()));
            return Ok(());
        }
        ConfigCommand::SetPath { path } => {
            if !path.exists() {
                OutputFormatter::warning(&format!("Path does not exist: {}", path.display()));
            }
            let message = format!("Download folder set to {}", path.display());
            config.default_download_path = path;
            message
        }
        ConfigCommand::SetConflict { policy } => {
            let policy = config.set_conflict_policy(&policy)?;
            format!("Conflict resolution set to {}", policy)
        }
        ConfigCommand::SetDryRun { enabled } => {
            config.dry_run = enabled;
            format!("Dry run by default: {}", enabled)
        }
    };

    // Only confirm once the change is on disk.
    store.save(&config)?;
    OutputFormatter::success(&message);
    Ok(())
}
