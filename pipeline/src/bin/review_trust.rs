//! Offline trust review for a source registry of skill manifests.
//!
//! Thin CLI wrapper around [`skillpack::review`] for CI: prints a Markdown
//! report to stdout, optionally copies it to a file, and exits non-zero
//! when any manifest fails validation or its trust threshold.

use clap::Parser;
use skillpack::output::write_stderr_line;
use skillpack::review::{
    ReviewError, ReviewMode, failure_summary, review_registry, write_report_file,
};
use std::io::Write;
use std::path::PathBuf;

/// Validate skill manifests and their computed trust scores.
#[derive(Parser, Debug)]
#[command(name = "skillpack-review-trust")]
#[command(version, about = "Validate skill manifests and their computed trust scores")]
struct ReviewCli {
    /// Registry directory searched for `skill.toml` files.
    #[arg(long, value_name = "DIR", default_value = "skills/registry")]
    root: PathBuf,

    /// Fail when stored `[computed]` tables are stale (default).
    #[arg(long, conflicts_with = "write")]
    check: bool,

    /// Rewrite `[computed]` tables from the current inputs.
    #[arg(long)]
    write: bool,

    /// Also write the Markdown report to this file.
    #[arg(long, value_name = "FILE")]
    report_file: Option<PathBuf>,
}

impl ReviewCli {
    const fn mode(&self) -> ReviewMode {
        if self.write {
            ReviewMode::Write
        } else {
            ReviewMode::Check
        }
    }
}

fn main() {
    let cli = ReviewCli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let exit_code = match run(&cli, &mut stdout, &mut stderr) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            write_stderr_line(&mut stderr, format!("error: {err}"));
            1
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Runs the review, returning whether every manifest passed.
fn run(cli: &ReviewCli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<bool, ReviewError> {
    let report = review_registry(&cli.root, cli.mode())?;
    if let Some(path) = &cli.report_file {
        write_report_file(path, &report)?;
    }
    if writeln!(stdout, "{}", report.to_markdown()).is_err() {
        // Best-effort output; the report file (if any) is already written.
    }
    if !report.passed() {
        write_stderr_line(stderr, failure_summary(&report));
    }
    Ok(report.passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_to_check_mode() {
        let cli = ReviewCli::parse_from(["skillpack-review-trust"]);
        assert_eq!(cli.mode(), ReviewMode::Check);
        assert_eq!(cli.root, PathBuf::from("skills/registry"));
    }

    #[test]
    fn check_and_write_conflict() {
        assert!(ReviewCli::try_parse_from(["skillpack-review-trust", "--check", "--write"]).is_err());
    }

    #[test]
    fn failing_review_reports_to_stderr_and_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let skill = temp.path().join("registry/demo");
        fs::create_dir_all(&skill).expect("mkdir");
        fs::write(skill.join("skill.toml"), "schema_version = 1\nslug = \"demo\"\n")
            .expect("write manifest");
        let report_file = temp.path().join("reports/trust.md");

        let cli = ReviewCli {
            root: temp.path().join("registry"),
            check: false,
            write: false,
            report_file: Some(report_file.clone()),
        };
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let passed = run(&cli, &mut stdout, &mut stderr).expect("review runs");

        assert!(!passed);
        let report = String::from_utf8(stdout).expect("stdout was not UTF-8");
        assert!(report.contains("## Failures"));
        assert!(fs::read_to_string(report_file).expect("report file").contains("| demo |"));
        let summary = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(summary.contains("trust review failures"));
    }
}
