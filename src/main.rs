use anyhow::{Context, Result};
use bundle_patcher::config::{self, RuleConfig, VersionGate};
use bundle_patcher::{
    GuardOptions, PatchSession, PersistenceGuard, RuleOutcome, RunOutcome, SessionReport,
};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};

/// Longest line printed in a diff; minified bundles are a handful of huge lines.
const DIFF_LINE_LIMIT: usize = 200;

#[derive(Parser)]
#[command(name = "bundle-patcher")]
#[command(about = "Idempotent performance patches for minified JavaScript bundles", long_about = None)]
#[command(version)]
struct Cli {
    /// Bundle to patch, e.g. "$(npm root -g)/<package>/cli.js"
    target: Option<PathBuf>,

    /// Rule set to apply (defaults to the built-in rules)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Dry run - report what would change without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Report which rules are already applied, without patching
    #[arg(short, long)]
    status: bool,

    /// Log level for diagnostics on stderr
    #[arg(long, default_value = "warn")]
    log_level: log::LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .format_timestamp(None)
        .init();

    let Some(target) = cli.target.clone() else {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
        println!("Examples:");
        println!("  bundle-patcher \"$(npm root -g)/@anthropic-ai/claude-code/cli.js\"");
        std::process::exit(1);
    };

    if let Err(e) = run(&cli, &target) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: &Cli, target: &Path) -> Result<()> {
    let (rules, source) = match &cli.rules {
        Some(path) => (config::load_from_path(path)?, path.display().to_string()),
        None => (config::builtin()?, "built-in".to_string()),
    };
    let session = config::build_session(&rules);

    println!("Target: {}", target.display());
    println!("Rules: {} ({})", rules.meta.name, source.dimmed());

    if cli.status {
        return cmd_status(&session, target);
    }

    let gate = config::check_version(&rules, target)?;
    if gate != VersionGate::Unconstrained {
        println!("Version: {}", gate);
    }
    println!();

    if !gate.allows() {
        for rule in session.rules() {
            println!("{} {}: Skipped ({})", "⊘".cyan(), rule.id(), gate);
        }
        println!("\n{}", "Version out of range; nothing written".yellow());
        return Ok(());
    }

    cmd_apply(cli, &rules, &session, target)
}

fn cmd_apply(cli: &Cli, rules: &RuleConfig, session: &PatchSession, target: &Path) -> Result<()> {
    let guard = PersistenceGuard::new(target);
    let options = GuardOptions {
        dry_run: cli.dry_run,
        validate_syntax: rules.scan.validate_syntax,
    };

    if cli.dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
    }

    let outcome = guard
        .run(session, &options)
        .with_context(|| format!("failed to patch {}", target.display()))?;

    let report = match &outcome {
        RunOutcome::AlreadyPatched => {
            println!(
                "{} {}",
                "⊙".yellow(),
                "Already patched. Reinstall the package to get a fresh bundle, then re-run."
                    .yellow()
            );
            return Ok(());
        }
        RunOutcome::NothingApplied { backup, report } => {
            println!("Backup saved: {}", backup.display());
            report
        }
        RunOutcome::DryRun { report } | RunOutcome::Committed { report, .. } => report,
    };

    print_results(report, cli.dry_run);

    if cli.diff && report.changed() {
        display_diff(target, report.original.as_str(), report.document.as_str());
    }

    println!();
    match &outcome {
        RunOutcome::Committed { backup, report } => {
            println!(
                "Patched {} rule(s) in: {}",
                format!("{}", report.applied_count()).green(),
                target.display()
            );
            println!(
                "Size: {} -> {} bytes",
                report.original.len(),
                report.document.len()
            );
            println!();
            println!("To verify syntax: node --check {}", target.display());
            println!("To revert: cp {} {}", backup.display(), target.display());
        }
        RunOutcome::DryRun { report } => {
            println!(
                "Would patch {} rule(s) ({} -> {} bytes)",
                report.applied_count(),
                report.original.len(),
                report.document.len()
            );
        }
        RunOutcome::NothingApplied { .. } => {
            println!(
                "{}",
                "No rules applied (already patched or functions not found)".yellow()
            );
        }
        RunOutcome::AlreadyPatched => {}
    }

    Ok(())
}

fn print_results(report: &SessionReport, dry_run: bool) {
    for result in &report.results {
        match &result.outcome {
            RuleOutcome::Applied { summary } => {
                let verb = if dry_run { "Would apply" } else { "Applied" };
                println!(
                    "{} {}: {} - {} ({} -> {} bytes)",
                    "✓".green(),
                    result.rule,
                    verb,
                    summary,
                    result.before_size,
                    result.after_size
                );
            }
            RuleOutcome::AlreadyApplied => {
                println!("{} {}: Already applied", "⊙".yellow(), result.rule);
            }
            RuleOutcome::NotFound { reason } => {
                println!("{} {}: Skipped ({})", "⊘".cyan(), result.rule, reason.dimmed());
            }
        }
    }
}

fn cmd_status(session: &PatchSession, target: &Path) -> Result<()> {
    let doc = PersistenceGuard::new(target).load()?;
    println!();

    let status = session.status(&doc);
    for (id, applied) in &status {
        if *applied {
            println!("{} {}: {}", "✓".green(), id, "APPLIED".green().bold());
        } else {
            println!("{} {}: {}", "⊙".yellow(), id, "NOT APPLIED".yellow().bold());
        }
    }

    let applied = status.iter().filter(|(_, applied)| *applied).count();
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", applied).green());
    println!(
        "  {} not applied",
        format!("{}", status.len() - applied).yellow()
    );

    Ok(())
}

/// Unified diff with long lines cut to [`DIFF_LINE_LIMIT`] characters.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let line = truncate_line(change.as_str().unwrap_or_default());
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", line).red(),
            ChangeTag::Insert => format!("+{}", line).green(),
            ChangeTag::Equal => continue,
        };
        println!("{}", sign);
    }
}

fn truncate_line(line: &str) -> String {
    let line = line.trim_end_matches('\n');
    match line.char_indices().nth(DIFF_LINE_LIMIT) {
        Some((cut, _)) => format!("{}... ({} more bytes)", &line[..cut], line.len() - cut),
        None => line.to_string(),
    }
}
