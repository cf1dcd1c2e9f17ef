use crate::error::{JournalError, Result};
use crate::fs::LocalFilesystem;
use crate::journal::{JournalingFilesystem, default_record_root};
use crate::plan::{Plan, Step};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
pub struct ApplyArgs {
    /// Plan file listing the steps to run
    pub plan: PathBuf,

    /// Directory holding session backups (overrides the plan's [journal] record-root)
    #[arg(long, value_name = "DIR")]
    pub record_root: Option<PathBuf>,

    /// List the steps without touching the file system
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

/// Error carried out of the transaction, tagged with the failing step.
#[derive(Debug)]
struct StepFailure {
    step: Option<usize>,
    error: JournalError,
}

impl From<JournalError> for StepFailure {
    fn from(error: JournalError) -> Self {
        Self { step: None, error }
    }
}

pub fn execute(args: ApplyArgs) -> Result<()> {
    let plan = Plan::load(&args.plan)?;

    let record_root = args
        .record_root
        .clone()
        .or_else(|| plan.record_root.clone())
        .unwrap_or_else(default_record_root);

    log::debug!("Record root: {}", record_root.display());

    if args.dry_run {
        print_summary(&plan, true);
        return Ok(());
    }

    let mut journal = JournalingFilesystem::new(LocalFilesystem::new(), record_root);

    let result = journal.transaction(|fs| {
        for (index, step) in plan.steps.iter().enumerate() {
            log::info!("Step {}: {}", index + 1, step);
            step.apply(fs).map_err(|error| StepFailure {
                step: Some(index),
                error,
            })?;
        }
        Ok::<_, StepFailure>(())
    });

    match result {
        Ok(()) => {
            print_summary(&plan, false);
            Ok(())
        }
        Err(failure) => {
            match failure.step.and_then(|i| plan.steps.get(i).map(|s| (i, s))) {
                Some((index, step)) => eprintln!(
                    "{} step {} ({}) failed: {}",
                    "Error:".red().bold(),
                    index + 1,
                    step.operation(),
                    failure.error
                ),
                None => eprintln!("{} {}", "Error:".red().bold(), failure.error),
            }

            if journal.is_active() {
                let kept = journal
                    .session()
                    .map(|s| s.path().display().to_string())
                    .unwrap_or_default();
                eprintln!(
                    "{} {}",
                    "✗ Rollback incomplete; backups kept in".red().bold(),
                    kept
                );
            } else {
                eprintln!("{}", "✓ All changes rolled back.".yellow());
            }

            Err(failure.error)
        }
    }
}

/// Prints the steps with paths relative to the plan directory.
fn print_summary(plan: &Plan, dry_run: bool) {
    let display_path = |path: &Path| -> String {
        let relative =
            pathdiff::diff_paths(path, &plan.base_dir).unwrap_or_else(|| path.to_path_buf());
        relative.to_string_lossy().replace('\\', "/")
    };

    let describe = |step: &Step| -> String {
        let paths: Vec<String> = step.paths().into_iter().map(&display_path).collect();
        format!("{:<16} {}", step.operation().to_string(), paths.join(" "))
    };

    if dry_run {
        println!("\n{}", "DRY RUN - No changes will be made".yellow().bold());
    } else {
        println!("\n{}", "Changes applied:".green().bold());
    }

    for step in &plan.steps {
        if dry_run {
            println!("   • {}", describe(step).dimmed());
        } else {
            println!("   {} {}", "✓".green(), describe(step).dimmed());
        }
    }

    println!();
    let count = plan.steps.len();
    if dry_run {
        println!(
            "{} {} would run. Run without {} to apply.",
            count.to_string().cyan().bold(),
            if count == 1 { "step" } else { "steps" },
            "--dry-run".cyan()
        );
    } else {
        println!(
            "{} Successfully completed {} {}",
            "✓".green().bold(),
            count,
            if count == 1 { "step" } else { "steps" }
        );
    }
}
