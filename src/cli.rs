use crate::copier::DEFAULT_WORKERS;
use crate::filter::{FilterCriteria, SubdirFilter};
use crate::indexer::DateSource;
use crate::session::SessionConfig;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// repopick – clone a repository, filter its files, copy the ones you pick
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository URL (anything git can clone, including local paths)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Where the working copy is kept between runs
    #[arg(long, value_name = "DIR", default_value = "temp_repo")]
    pub clone_dir: PathBuf,

    /// Where selected files are copied to (defaults to ~/Downloads/git_files)
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Only list files under this top-level subdirectory ("All" for every one)
    #[arg(long, value_name = "NAME", default_value = "All")]
    pub subdir: String,

    /// Only list files modified on or after this date
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Only list files modified on or before this date
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Which timestamp a file is dated by
    #[arg(long, value_enum, default_value_t = DateSource::Mtime)]
    pub dates: DateSource,

    /// Number of files copied concurrently
    #[arg(long, value_name = "N", default_value_t = DEFAULT_WORKERS, value_parser = parse_jobs)]
    pub jobs: usize,

    /// Remove the repository at --clone-dir and clone anew.
    /// Directories that are not repositories are never removed.
    #[arg(long)]
    pub fresh: bool,

    /// Run headless: copy every file that passes the filters and exit.
    #[arg(long, conflicts_with = "select")]
    pub all: bool,

    /// Run headless: copy these relative paths and exit.
    /// Can be specified multiple times using --select <PATH_1> --select <PATH_2> ...
    #[arg(long, value_name = "PATH")]
    pub select: Vec<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log debug detail
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{value}': {e}"))
}

fn parse_jobs(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("at least one worker is needed".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Parses a date typed into the interactive shell. Empty input clears it.
pub fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, String> {
    let value = value.trim();
    if value.is_empty() {
        Ok(None)
    } else {
        parse_date(value).map(Some)
    }
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.all || !self.select.is_empty()
    }

    pub fn destination(&self) -> PathBuf {
        self.dest.clone().unwrap_or_else(default_destination)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            clone_dir: self.clone_dir.clone(),
            destination: self.destination(),
            workers: self.jobs,
            date_source: self.dates,
            fresh: self.fresh,
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            subdir: SubdirFilter::parse(&self.subdir),
            date_from: self.from,
            date_to: self.to,
        }
    }
}

fn default_destination() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join("Downloads").join("git_files"),
        None => PathBuf::from("git_files"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["repopick", "https://example.com/r.git"]).unwrap();

        assert_eq!(cli.clone_dir, PathBuf::from("temp_repo"));
        assert_eq!(cli.jobs, DEFAULT_WORKERS);
        assert_eq!(cli.dates, DateSource::Mtime);
        assert_eq!(cli.criteria(), FilterCriteria::default());
        assert!(!cli.is_headless());
        assert!(cli.destination().ends_with("git_files"));
        assert!(!cli.session_config().fresh);
    }

    #[test]
    fn test_fresh_flag_reaches_session_config() {
        let cli = Cli::try_parse_from(["repopick", "repo", "--fresh"]).unwrap();
        assert!(cli.session_config().fresh);
    }

    #[test]
    fn test_filters_and_headless_flags() {
        let cli = Cli::try_parse_from([
            "repopick",
            "repo",
            "--subdir",
            "src",
            "--from",
            "2024-05-01",
            "--dates",
            "commit",
            "--select",
            "src/a.rs",
            "--select",
            "src/b.rs",
        ])
        .unwrap();

        let criteria = cli.criteria();
        assert_eq!(criteria.subdir, SubdirFilter::Named("src".to_string()));
        assert_eq!(criteria.date_from, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(criteria.date_to, None);
        assert_eq!(cli.dates, DateSource::Commit);
        assert_eq!(cli.select, vec!["src/a.rs", "src/b.rs"]);
        assert!(cli.is_headless());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["repopick", "repo", "--jobs", "0"]).is_err());
        assert!(Cli::try_parse_from(["repopick", "repo", "--from", "05/01/2024"]).is_err());
        assert!(Cli::try_parse_from(["repopick", "repo", "--all", "--select", "x"]).is_err());
    }

    #[test]
    fn test_parse_optional_date() {
        assert_eq!(parse_optional_date("  "), Ok(None));
        assert_eq!(
            parse_optional_date("2024-06-01"),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 1))
        );
        assert!(parse_optional_date("june").is_err());
    }
}
