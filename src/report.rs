//! Report Export Module
//! Writes the summary, the client sample and the overview figures to the
//! output directory, and formats the summary table for the terminal.

use crate::analysis::Analysis;
use crate::data::ClientRecord;
use crate::stats::{BandCount, MonthSummary, YearCount};
use polars::prelude::*;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const SUMMARY_CSV: &str = "summary.csv";
pub const CLIENT_SAMPLE_CSV: &str = "client_sample.csv";
pub const REPORT_JSON: &str = "report.json";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Headline figures of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub source: String,
    pub raw_rows: usize,
    pub clients: usize,
    pub observations: usize,
    pub duplicates_collapsed: usize,
    pub month_groups: usize,
    pub first_origination: Option<String>,
    pub last_origination: Option<String>,
}

impl Overview {
    pub fn new(analysis: &Analysis, source: &Path) -> Self {
        let clients = &analysis.tables.clients;
        let first = clients.iter().map(|c| c.origination).min();
        let last = clients.iter().map(|c| c.origination).max();

        Self {
            source: source.display().to_string(),
            raw_rows: analysis.raw_rows,
            clients: clients.len(),
            observations: analysis.tables.delinquency.len(),
            duplicates_collapsed: analysis.tables.duplicates_collapsed,
            month_groups: analysis.summary.len(),
            first_origination: first.map(|m| m.to_string()),
            last_origination: last.map(|m| m.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    overview: Overview,
    summary: &'a [MonthSummary],
    score_bands: &'a [BandCount],
    origination_years: &'a [YearCount],
}

/// Writes report artifacts into one directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Write `summary.csv`, `client_sample.csv` and `report.json`.
    pub fn write_all(&self, analysis: &Analysis, source: &Path) -> Result<(), ReportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut summary = Self::summary_frame(&analysis.summary)?;
        self.write_csv(&mut summary, SUMMARY_CSV)?;

        let mut clients = Self::client_frame(&analysis.tables.clients)?;
        self.write_csv(&mut clients, CLIENT_SAMPLE_CSV)?;

        let document = ReportDocument {
            overview: Overview::new(analysis, source),
            summary: &analysis.summary,
            score_bands: &analysis.score_bands,
            origination_years: &analysis.origination_years,
        };
        let path = self.path(REPORT_JSON);
        let json = serde_json::to_string_pretty(&document)?;
        fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        info!("report written to {}", self.output_dir.display());
        Ok(())
    }

    fn write_csv(&self, df: &mut DataFrame, file_name: &str) -> Result<(), ReportError> {
        let path = self.path(file_name);
        let mut file = File::create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }

    /// Summary table as a DataFrame, one row per month group.
    pub fn summary_frame(summaries: &[MonthSummary]) -> Result<DataFrame, ReportError> {
        let df = DataFrame::new(vec![
            Column::new(
                "months_since_origination".into(),
                summaries
                    .iter()
                    .map(|s| s.months_since_origination)
                    .collect::<Vec<u32>>(),
            ),
            Column::new(
                "count".into(),
                summaries.iter().map(|s| s.count as u64).collect::<Vec<u64>>(),
            ),
            Column::new(
                "mean".into(),
                summaries.iter().map(|s| s.mean).collect::<Vec<f64>>(),
            ),
            Column::new(
                "min".into(),
                summaries.iter().map(|s| s.min).collect::<Vec<u64>>(),
            ),
            Column::new(
                "max".into(),
                summaries.iter().map(|s| s.max).collect::<Vec<u64>>(),
            ),
            Column::new(
                "median".into(),
                summaries.iter().map(|s| s.median).collect::<Vec<f64>>(),
            ),
        ])?;
        Ok(df)
    }

    /// Client sample as a DataFrame.
    pub fn client_frame(clients: &[ClientRecord]) -> Result<DataFrame, ReportError> {
        let df = DataFrame::new(vec![
            Column::new(
                "client_id".into(),
                clients
                    .iter()
                    .map(|c| c.client_id.0.clone())
                    .collect::<Vec<String>>(),
            ),
            Column::new(
                "origination_year".into(),
                clients
                    .iter()
                    .map(|c| c.origination_year())
                    .collect::<Vec<i32>>(),
            ),
            Column::new(
                "origination_month".into(),
                clients
                    .iter()
                    .map(|c| c.origination_month_of_year())
                    .collect::<Vec<u32>>(),
            ),
            Column::new(
                "score_band".into(),
                clients
                    .iter()
                    .map(|c| c.score_band.0)
                    .collect::<Vec<u32>>(),
            ),
        ])?;
        Ok(df)
    }
}

/// Fixed-width summary table for the terminal.
pub fn format_summary_table(summaries: &[MonthSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:>6}  {:>12}  {:>10}  {:>10}  {:>10}",
        "month", "n", "mean", "min", "max", "median"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:>6}  {:>6}  {:>12.3}  {:>10}  {:>10}  {:>10.1}",
            s.months_since_origination, s.count, s.mean, s.min, s.max, s.median
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawRecord;

    fn analysis() -> Analysis {
        Analysis::from_records(&[
            RawRecord::new("2021-01", 3, "c1", 0, 10),
            RawRecord::new("2021-01", 3, "c1", 1, 15),
            RawRecord::new("2021-02", 5, "c2", 0, 8),
        ])
        .unwrap()
    }

    #[test]
    fn overview_counts() {
        let overview = Overview::new(&analysis(), Path::new("input.csv"));
        assert_eq!(overview.raw_rows, 3);
        assert_eq!(overview.clients, 2);
        assert_eq!(overview.observations, 3);
        assert_eq!(overview.duplicates_collapsed, 1);
        assert_eq!(overview.month_groups, 2);
        assert_eq!(overview.first_origination.as_deref(), Some("2021-01"));
        assert_eq!(overview.last_origination.as_deref(), Some("2021-02"));
    }

    #[test]
    fn summary_frame_shape() {
        let df = ReportWriter::summary_frame(&analysis().summary).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 6);
    }

    #[test]
    fn table_lists_months_in_order() {
        let table = format_summary_table(&analysis().summary);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("mean"));
        assert!(lines[1].trim_start().starts_with('0'));
        assert!(lines[1].contains("9.000"));
        assert!(lines[2].trim_start().starts_with('1'));
    }

    #[test]
    fn writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let writer = ReportWriter::new(&out);
        writer
            .write_all(&analysis(), Path::new("input.csv"))
            .unwrap();

        let summary = fs::read_to_string(writer.path(SUMMARY_CSV)).unwrap();
        assert!(summary.starts_with("months_since_origination,count,mean,min,max,median"));
        assert_eq!(summary.lines().count(), 3);

        let clients = fs::read_to_string(writer.path(CLIENT_SAMPLE_CSV)).unwrap();
        assert_eq!(clients.lines().count(), 3);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.path(REPORT_JSON)).unwrap()).unwrap();
        assert_eq!(json["overview"]["clients"], 2);
        assert_eq!(json["summary"][0]["mean"], 9.0);
    }
}
