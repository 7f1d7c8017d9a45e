use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use vmbox_logging::LogDestination;

/// Trigger a lab VM action and wait for the page region to refresh.
#[derive(Debug, Parser)]
#[command(name = "vmbox", version, about)]
pub struct Cli {
    /// Page that hosts the region, e.g. https://lab.example/scenario/show/web
    #[arg(long)]
    pub page: String,

    /// Id of the region element inside the page.
    #[arg(long)]
    pub region: Option<String>,

    /// Action to submit. Without it the bound forms are listed.
    #[arg(long)]
    pub action: Option<String>,

    /// Index of the form to use when several offer the action.
    #[arg(long)]
    pub form: Option<usize>,

    /// RON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Give up after this many "still running" answers.
    #[arg(long, conflicts_with = "unbounded")]
    pub max_attempts: Option<u32>,

    /// Poll for as long as the server says the task is running.
    #[arg(long)]
    pub unbounded: bool,

    /// Cookie sent with every request, e.g. `sessionid=...`. Repeatable.
    #[arg(long = "cookie")]
    pub cookies: Vec<String>,

    #[arg(long)]
    pub reveal_spoilers: bool,

    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl LogTarget {
    pub fn destination(self) -> LogDestination {
        match self {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, LogTarget};

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "vmbox",
            "--page",
            "http://lab.example/scenario/show/web",
            "--action",
            "start",
            "--max-attempts",
            "5",
            "--cookie",
            "sessionid=a",
            "--cookie",
            "csrftoken=b",
            "--log",
            "both",
        ])
        .unwrap();
        assert_eq!(cli.action.as_deref(), Some("start"));
        assert_eq!(cli.max_attempts, Some(5));
        assert_eq!(cli.cookies, vec!["sessionid=a", "csrftoken=b"]);
        assert_eq!(cli.log, LogTarget::Both);
    }

    #[test]
    fn bounded_and_unbounded_conflict() {
        let result = Cli::try_parse_from([
            "vmbox",
            "--page",
            "http://lab.example/",
            "--max-attempts",
            "5",
            "--unbounded",
        ]);
        assert!(result.is_err());
    }
}
