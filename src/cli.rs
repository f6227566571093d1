//! Command line interface

use crate::settings::{ReportSettings, SettingsError};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "delinquency-report")]
#[command(
    about = "Split a delinquency extract, aggregate it per month since origination and chart it",
    long_about = None
)]
pub struct Cli {
    /// CSV extract with the five delinquency columns
    pub input: PathBuf,

    /// Directory for CSV, JSON and PNG outputs
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON settings file; flags given here take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Do not print the summary table
    #[arg(short, long)]
    pub quiet: bool,

    /// Chart image width in pixels
    #[arg(long)]
    pub chart_width: Option<u32>,

    /// Chart image height in pixels
    #[arg(long)]
    pub chart_height: Option<u32>,

    /// Mark the noncollectable threshold on the ribbon chart
    #[arg(long, value_name = "MONTHS")]
    pub noncollectable_after: Option<u32>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolve settings: defaults, then the config file, then flags.
    pub fn settings(&self) -> Result<ReportSettings, SettingsError> {
        let mut settings = match &self.config {
            Some(path) => ReportSettings::from_json_file(path)?,
            None => ReportSettings::default(),
        };

        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if self.no_charts {
            settings.charts = false;
        }
        if self.quiet {
            settings.print_summary = false;
        }
        if let Some(width) = self.chart_width {
            settings.chart_width = width;
        }
        if let Some(height) = self.chart_height {
            settings.chart_height = height;
        }
        if self.noncollectable_after.is_some() {
            settings.noncollectable_after = self.noncollectable_after;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "delinquency-report",
            "data.csv",
            "--output-dir",
            "out",
            "--no-charts",
            "--noncollectable-after",
            "12",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("data.csv"));
        assert_eq!(cli.log_level(), "trace");

        let settings = cli.settings().unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert!(!settings.charts);
        assert!(settings.print_summary);
        assert_eq!(settings.noncollectable_after, Some(12));
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["delinquency-report"]).is_err());
    }

    #[test]
    fn invalid_chart_size_flag() {
        let cli =
            Cli::try_parse_from(["delinquency-report", "data.csv", "--chart-width", "50"]).unwrap();
        assert!(matches!(cli.settings(), Err(SettingsError::Invalid(_))));
    }
}
