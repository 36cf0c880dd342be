//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored
//! messages, the organize progress bar, and summary tables. Diagnostic logging
//! goes through `tracing` instead; this module is only for what the user
//! asked to see.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

use crate::file_organizer::{FileOutcome, RunStats};
use crate::rules::Rule;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use taxon::output::OutputFormatter;
    /// OutputFormatter::success("Rule 'invoices' added");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for an organize run.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use taxon::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Renders one line describing what happened to a file.
    pub fn outcome_line(outcome: &FileOutcome) -> String {
        let name = outcome
            .source()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match outcome {
            FileOutcome::Moved {
                destination,
                category,
                overwrote,
                dry_run,
                ..
            } => {
                let new_name = destination
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let verb = if *dry_run { "Would move" } else { "Moved" };
                let suffix = if *overwrote { " (overwrote)" } else { "" };
                format!(
                    "{} {} {} → {}/{}{}",
                    "✓".green(),
                    verb,
                    name,
                    category,
                    new_name,
                    suffix.yellow()
                )
            }
            FileOutcome::Skipped { .. } => {
                format!("{} Skipped {} (destination exists)", "⚠".yellow(), name)
            }
            FileOutcome::Failed { error, .. } => {
                format!("{} {}: {}", "✗".red(), name, error)
            }
        }
    }

    /// Prints the final counters of a run.
    pub fn run_summary(stats: &RunStats, dry_run: bool) {
        Self::header(if dry_run { "DRY RUN SUMMARY" } else { "SUMMARY" });
        println!("  {:<8} {}", "Moved", stats.moved.to_string().green());
        println!("  {:<8} {}", "Skipped", stats.skipped.to_string().yellow());
        let errored = stats.errored.to_string();
        println!(
            "  {:<8} {}",
            "Errors",
            if stats.errored > 0 {
                errored.red()
            } else {
                errored.normal()
            }
        );
    }

    /// Prints a summary table with file counts per category.
    pub fn category_table(category_counts: &BTreeMap<String, usize>) {
        if category_counts.is_empty() {
            return;
        }

        let width = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "\n{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (category, count) in category_counts {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                file_word,
                width = width
            );
        }
    }

    /// Prints the custom rules in evaluation order.
    pub fn rule_list(rules: &[Rule]) {
        if rules.is_empty() {
            Self::info("No custom rules configured.");
            return;
        }

        Self::header("CUSTOM RULES");
        println!("{}", "-".repeat(60));
        for rule in rules {
            println!("{}", rule.name.bold());
            println!("  type:           {}", rule.kind);
            println!("  pattern:        {}", rule.pattern);
            println!("  target folder:  {}", rule.target_folder);
            println!("  priority:       {}", rule.priority);
            println!("  case sensitive: {}", rule.case_sensitive);
        }
    }
}
