use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use depprune::{BuildEnv, Conventions, Mode, PruneError, PruneReport, Session};
use humansize::{format_size, BINARY};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = "\
Modes:
  depprune [FILE]          remove the dependency files of the current directory,
                           or only those referring to FILE
  depprune -a [FILE]       as above, for every platform/options directory
  depprune -o [DIR...]     remove dependency files whose source no longer exists
                           (default: current directory)
  depprune -u              from the project root: find dangling source links,
                           remove every dependency file referring to them, then
                           remove the links";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Remove stale dependency (.dep) files from build object directories",
    long_about = None,
    after_help = AFTER_HELP
)]
struct Args {
    /// Source file name (bulk modes) or source directories (--old)
    #[arg(value_name = "FILE|DIR")]
    targets: Vec<PathBuf>,

    /// Act on the dependency files of every platform/options directory
    #[arg(short = 'a', long = "all")]
    all_platforms: bool,

    /// Remove dependency files whose source file no longer exists
    #[arg(short = 'o', long, conflicts_with_all = ["all_platforms", "update"])]
    old: bool,

    /// Sweep dangling source links project-wide (run from the project root)
    #[arg(short = 'u', long, conflicts_with = "all_platforms")]
    update: bool,

    /// Project root directory
    #[arg(long, env = "WM_PROJECT_DIR", value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Platform/options identifier naming the object directories
    #[arg(long, env = "WM_OPTIONS", value_name = "ID")]
    options: Option<String>,

    /// TOML file overriding the built-in naming conventions
    #[arg(long, env = "DEPPRUNE_CONVENTIONS", value_name = "FILE")]
    conventions: Option<PathBuf>,

    /// Show diagnostic output (RUST_LOG takes precedence)
    #[arg(long, short)]
    verbose: bool,
}

/// Work out the mode from the flags; rejects argument combinations clap can't express
fn select_mode(args: &Args) -> Result<Mode, PruneError> {
    if args.update {
        if !args.targets.is_empty() {
            return Err(PruneError::Usage("--update does not take any arguments".to_string()));
        }
        return Ok(Mode::LinkSweep);
    }

    if args.old {
        return Ok(Mode::Orphans {
            dirs: args.targets.clone(),
        });
    }

    if args.targets.len() > 1 {
        return Err(PruneError::Usage(format!(
            "expected at most one source file name, got {}",
            args.targets.len()
        )));
    }

    Ok(Mode::Bulk {
        all_platforms: args.all_platforms,
        filter: args
            .targets
            .first()
            .map(|target| target.to_string_lossy().into_owned()),
    })
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "depprune=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(report: &PruneReport) {
    println!("========================================");

    if report.removed.is_empty() && report.unlinked.is_empty() {
        println!("Nothing to remove.");
    } else {
        println!(
            "Removed {} dependency files ({})",
            report.removed_count().to_string().bold(),
            format_size(report.bytes_freed, BINARY).bold().green()
        );
    }
    if report.kept > 0 {
        println!("Kept {} dependency files with existing sources", report.kept);
    }
    if !report.unlinked.is_empty() {
        println!("Removed {} dangling links", report.unlinked.len());
    }
    if !report.skipped_roots.is_empty() {
        println!("Skipped {} missing directories", report.skipped_roots.len());
    }
    if !report.failed.is_empty() {
        println!(
            "{}",
            format!("Failed to remove {} files (see above)", report.failed.len()).red()
        );
    }
}

fn run(args: Args) -> Result<()> {
    let mode = select_mode(&args)?;
    let conventions = Conventions::load(args.conventions.as_deref())?;
    let env = BuildEnv::resolve(args.project_dir.as_deref(), args.options.as_deref())?;
    let working_dir =
        std::env::current_dir().context("Failed to determine the current directory")?;

    let session = Session::new(env, conventions, &working_dir);
    let report = session.run(&mode)?;
    print_summary(&report);

    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version go to stdout; everything else is a usage error
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            if matches!(err.downcast_ref::<PruneError>(), Some(PruneError::Usage(_))) {
                eprintln!();
                eprintln!("{}", Args::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("depprune").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_mode_is_bulk() {
        assert_eq!(
            select_mode(&parse(&[])).unwrap(),
            Mode::Bulk {
                all_platforms: false,
                filter: None
            }
        );
    }

    #[test]
    fn test_bulk_with_filter_and_all_platforms() {
        assert_eq!(
            select_mode(&parse(&["-a", "levelSet.H"])).unwrap(),
            Mode::Bulk {
                all_platforms: true,
                filter: Some("levelSet.H".to_string())
            }
        );
    }

    #[test]
    fn test_bulk_rejects_multiple_files() {
        let err = select_mode(&parse(&["a.H", "b.H"])).unwrap_err();
        assert!(matches!(err, PruneError::Usage(_)));
    }

    #[test]
    fn test_old_collects_directories() {
        assert_eq!(
            select_mode(&parse(&["--old", "src/a", "src/b"])).unwrap(),
            Mode::Orphans {
                dirs: vec![PathBuf::from("src/a"), PathBuf::from("src/b")]
            }
        );
    }

    #[test]
    fn test_update_rejects_arguments() {
        assert!(matches!(select_mode(&parse(&["-u"])).unwrap(), Mode::LinkSweep));
        assert!(select_mode(&parse(&["-u", "foo.C"])).is_err());
    }

    #[test]
    fn test_conflicting_modes_rejected_by_parser() {
        let result = Args::try_parse_from(["depprune", "--old", "--update"]);
        assert!(result.is_err());
        let result = Args::try_parse_from(["depprune", "-a", "-o"]);
        assert!(result.is_err());
    }
}
