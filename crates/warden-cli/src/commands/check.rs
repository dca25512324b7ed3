//! `warden check` command implementation

use anyhow::{Context, bail};
use colored::Colorize;
use std::path::Path;
use warden_runtime::manifest::{DirectoryReport, IssueSeverity, check_directory};

/// Execute the `warden check` command
pub fn run(dir: &Path) -> anyhow::Result<()> {
    println!(
        "{} Checking capability manifests in {}",
        "->".green(),
        dir.display().to_string().cyan()
    );

    let report = check_directory(dir)
        .with_context(|| format!("cannot read manifest directory {}", dir.display()))?;
    print_report(&report);

    if report.files.is_empty() || report.is_clean() {
        return Ok(());
    }
    bail!(
        "found {} issue(s) in {} manifest file(s)",
        report.issues.len(),
        report.files.len()
    );
}

fn print_report(report: &DirectoryReport) {
    if report.files.is_empty() {
        println!("{} No capability files found", "Warning".yellow());
        return;
    }

    for file in &report.files {
        println!("  {}", file.display());
        for issue in report.issues.iter().filter(|i| i.file.as_deref() == Some(file.as_path())) {
            let tag = match issue.severity {
                IssueSeverity::Error => "error".red().bold(),
                IssueSeverity::Warning => "warning".yellow().bold(),
            };
            println!("    {tag}: {}", issue.message);
        }
    }

    println!();
    if report.is_clean() {
        println!("{} No issues found in capability files", "✓".green());
    } else {
        println!(
            "{} {} error(s), {} warning(s)",
            "✗".red(),
            report.errors(),
            report.issues.len() - report.errors()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn clean_directory_passes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.json"),
            r#"{"identifier":"main","description":"main window","windows":["main"],"permissions":["core:default"]}"#,
        )
        .unwrap();
        assert!(run(dir.path()).is_ok());
    }

    #[test]
    fn risky_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.json"),
            r#"{"identifier":"main","description":"main window","windows":["*"],"permissions":["shell:all"]}"#,
        )
        .unwrap();
        let err = run(dir.path()).unwrap_err();
        assert!(err.to_string().contains("2 issue(s)"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("absent")).is_err());
    }
}
