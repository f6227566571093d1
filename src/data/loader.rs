//! CSV Data Loader Module
//! Reads the delinquency extract with Polars and turns it into typed rows.

use polars::prelude::*;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Expected header, in file order.
pub const COLUMNS: [&str; 5] = [
    "origination_month",
    "score_band_v2",
    "nb_clients",
    "months_since_origination",
    "clients_on_default",
];

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Unexpected header: expected [{expected}], found [{found}]")]
    Schema { expected: String, found: String },
    #[error("Line {line}: invalid {column} value {value:?} ({reason})")]
    Format {
        line: usize,
        column: &'static str,
        value: String,
        reason: String,
    },
    #[error("Input contains no data rows")]
    EmptyInput,
}

/// One row of the extract as it appears in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub origination_month: String,
    pub score_band_v2: u32,
    pub nb_clients: String,
    pub months_since_origination: u32,
    pub clients_on_default: u64,
}

impl RawRecord {
    pub fn new(
        origination_month: &str,
        score_band_v2: u32,
        nb_clients: &str,
        months_since_origination: u32,
        clients_on_default: u64,
    ) -> Self {
        Self {
            origination_month: origination_month.to_string(),
            score_band_v2,
            nb_clients: nb_clients.to_string(),
            months_since_origination,
            clients_on_default,
        }
    }
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    df: Option<DataFrame>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self { df: None }
    }

    /// Load a CSV file. Every column is read as text so that parsing, and
    /// its error reporting, stays under our control.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, DataError> {
        if fs::metadata(file_path).is_ok_and(|meta| meta.len() == 0) {
            return Err(DataError::EmptyInput);
        }

        let df = match LazyCsvReader::new(file_path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
            .and_then(|lazy| lazy.collect())
        {
            Ok(df) => df,
            Err(e) => return Err(Self::classify_read_error(e, file_path)),
        };
        info!("read {} rows from {}", df.height(), file_path.display());

        self.set_dataframe(df)?;
        self.df.as_ref().ok_or(DataError::EmptyInput)
    }

    /// Map a reader failure onto the load error taxonomy. The lazy scan wraps
    /// its errors in context layers, so the innermost error decides.
    fn classify_read_error(e: PolarsError, file_path: &Path) -> DataError {
        let (no_data, ragged) = match innermost(&e) {
            PolarsError::NoData(_) => (true, false),
            inner @ PolarsError::ComputeError(_) => {
                (false, inner.to_string().contains("more fields"))
            }
            _ => (false, false),
        };

        if no_data {
            return DataError::EmptyInput;
        }
        if ragged {
            if let Some(err) = fs::read_to_string(file_path)
                .ok()
                .and_then(|text| first_ragged_line(&text))
            {
                return err;
            }
        }
        DataError::CsvError(e)
    }

    /// Set DataFrame directly. The header is checked before it is accepted.
    pub fn set_dataframe(&mut self, df: DataFrame) -> Result<(), DataError> {
        Self::validate_header(&df)?;
        self.df = Some(df);
        Ok(())
    }

    fn validate_header(df: &DataFrame) -> Result<(), DataError> {
        let found: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.trim().to_string())
            .collect();
        if found != COLUMNS {
            return Err(DataError::Schema {
                expected: COLUMNS.join(", "),
                found: found.join(", "),
            });
        }
        Ok(())
    }

    /// Convert the loaded frame into typed rows.
    ///
    /// Fails on the first missing or malformed numeric field; a frame with
    /// no rows is an [`DataError::EmptyInput`].
    pub fn records(&self) -> Result<Vec<RawRecord>, DataError> {
        let Some(df) = &self.df else {
            return Err(DataError::EmptyInput);
        };
        if df.height() == 0 {
            return Err(DataError::EmptyInput);
        }

        // Columns are addressed by position: the header check has already
        // pinned the order and raw names may carry stray whitespace.
        let text: Vec<Column> = df
            .get_columns()
            .iter()
            .map(|col| col.cast(&DataType::String))
            .collect::<PolarsResult<_>>()?;
        let months = text[0].str()?;
        let scores = text[1].str()?;
        let clients = text[2].str()?;
        let offsets = text[3].str()?;
        let defaults = text[4].str()?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            // Header is line 1.
            let line = i + 2;
            records.push(RawRecord {
                origination_month: required(months.get(i), line, COLUMNS[0])?.to_string(),
                score_band_v2: parse_number(scores.get(i), line, COLUMNS[1])?,
                nb_clients: required(clients.get(i), line, COLUMNS[2])?.to_string(),
                months_since_origination: parse_number(offsets.get(i), line, COLUMNS[3])?,
                clients_on_default: parse_number(defaults.get(i), line, COLUMNS[4])?,
            });
        }

        debug!("parsed {} raw records", records.len());
        Ok(records)
    }
}

/// Load and parse a CSV file in one step.
pub fn load_records(file_path: &Path) -> Result<Vec<RawRecord>, DataError> {
    let mut loader = DataLoader::new();
    loader.load_csv(file_path)?;
    loader.records()
}

fn innermost(e: &PolarsError) -> &PolarsError {
    match e {
        PolarsError::Context { error, .. } => innermost(error),
        other => other,
    }
}

/// Number of comma separated fields in one CSV line, honouring quotes.
fn field_count(line: &str) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields += 1,
            _ => {}
        }
    }
    fields
}

/// First line with more fields than the header declares, as a format error.
fn first_ragged_line(text: &str) -> Option<DataError> {
    text.lines()
        .enumerate()
        .skip(1)
        .find(|(_, line)| field_count(line) > COLUMNS.len())
        .map(|(idx, line)| DataError::Format {
            line: idx + 1,
            column: COLUMNS[COLUMNS.len() - 1],
            value: line.to_string(),
            reason: format!(
                "{} fields, expected {}",
                field_count(line),
                COLUMNS.len()
            ),
        })
}

fn required<'a>(
    value: Option<&'a str>,
    line: usize,
    column: &'static str,
) -> Result<&'a str, DataError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DataError::Format {
            line,
            column,
            value: String::new(),
            reason: "missing value".to_string(),
        }),
    }
}

fn parse_number<T>(value: Option<&str>, line: usize, column: &'static str) -> Result<T, DataError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = required(value, line, column)?;
    raw.parse::<T>().map_err(|e| DataError::Format {
        line,
        column,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
