use std::fs;
use std::io::Write;

use color_eyre::eyre::Result;
use duct::cmd;

use crate::cli::LintArgs;

// ---------------------------------------------------------------------------
// Check table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckId {
    Fmt,
    Clippy,
    Test,
}

struct Check {
    id: CheckId,
    args: &'static [&'static str],
    /// Replacement args under `--fix`.
    fix_args: Option<&'static [&'static str]>,
}

enum CheckOutcome {
    Passed { output: String },
    Failed { output: String },
}

/// Run in order; the first failure stops the pipeline.
const CHECKS: &[Check] = &[
    Check {
        id: CheckId::Fmt,
        args: &["fmt", "--all", "--check"],
        fix_args: Some(&["fmt", "--all"]),
    },
    Check {
        id: CheckId::Clippy,
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        fix_args: Some(&[
            "clippy",
            "--workspace",
            "--all-targets",
            "--fix",
            "--allow-dirty",
            "--",
            "-D",
            "warnings",
        ]),
    },
    Check {
        id: CheckId::Test,
        args: &["test", "--workspace"],
        fix_args: None,
    },
];

fn should_skip(id: CheckId, args: &LintArgs) -> bool {
    match id {
        CheckId::Fmt => args.no_fmt,
        CheckId::Clippy => args.no_clippy,
        CheckId::Test => args.no_test,
    }
}

fn effective_args(check: &Check, fix: bool) -> &'static [&'static str] {
    match (fix, check.fix_args) {
        (true, Some(fix_args)) => fix_args,
        _ => check.args,
    }
}

fn display_name(args: &[&str]) -> String {
    format!("cargo {}", args.join(" "))
}

fn format_log_entry(name: &str, outcome: &CheckOutcome) -> String {
    match outcome {
        CheckOutcome::Passed { output } => format!("=== {} (ok) ===\n{}\n", name, output),
        CheckOutcome::Failed { output } => format!("=== {} (failed) ===\n{}\n", name, output),
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub fn run(args: &LintArgs) -> Result<()> {
    let log_path = std::env::current_dir()?.join("target").join("xtask-lint.log");
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut log_file = fs::File::create(&log_path)?;

    for check in CHECKS.iter().filter(|c| !should_skip(c.id, args)) {
        let check_args = effective_args(check, args.fix);
        let name = display_name(check_args);

        let output = cmd("cargo", check_args)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()?;
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        let outcome = if output.status.success() {
            CheckOutcome::Passed { output: text }
        } else {
            CheckOutcome::Failed { output: text }
        };

        write!(log_file, "{}", format_log_entry(&name, &outcome))?;

        match outcome {
            CheckOutcome::Passed { output } => {
                if args.verbose {
                    print!("{output}");
                }
                println!("[ok] {name}");
            }
            CheckOutcome::Failed { output } => {
                print!("{output}");
                println!("\nlint failed at: {name}");
                println!("log: {}", log_path.display());
                drop(log_file);
                std::process::exit(1);
            }
        }
    }

    println!("log: {}", log_path.display());
    Ok(())
}
