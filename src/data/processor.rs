//! Data Processor Module
//! Splits the fused extract into the client sample and the delinquency table.

use super::loader::{DataError, RawRecord, COLUMNS};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Why an origination month label was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonthParseError {
    #[error("expected YYYY-MM")]
    Shape,
    #[error("month {0:02} out of range")]
    MonthOutOfRange(u32),
}

/// Calendar month a card was issued, anchored to its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OriginationMonth(NaiveDate);

impl OriginationMonth {
    /// Parse a strict `YYYY-MM` label.
    pub fn parse(label: &str) -> Result<Self, MonthParseError> {
        let bytes = label.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit);
        if !well_formed {
            return Err(MonthParseError::Shape);
        }

        let year: i32 = label[..4].parse().map_err(|_| MonthParseError::Shape)?;
        let month: u32 = label[5..].parse().map_err(|_| MonthParseError::Shape)?;
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(MonthParseError::MonthOutOfRange(month))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month of year, 1..=12.
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for OriginationMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// Score band label. Compared by raw value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScoreBand(pub u32);

/// Opaque client identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub String);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientRecord {
    pub client_id: ClientId,
    pub origination: OriginationMonth,
    pub score_band: ScoreBand,
}

impl ClientRecord {
    pub fn origination_year(&self) -> i32 {
        self.origination.year()
    }

    pub fn origination_month_of_year(&self) -> u32 {
        self.origination.month()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelinquencyObservation {
    pub months_since_origination: u32,
    pub clients_on_default: u64,
}

/// Both derived tables produced from one load.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTables {
    pub clients: Vec<ClientRecord>,
    pub delinquency: Vec<DelinquencyObservation>,
    /// Raw rows whose client tuple was already present.
    pub duplicates_collapsed: usize,
}

/// Handles the split of raw rows into derived tables.
pub struct DataProcessor;

impl DataProcessor {
    /// Split raw rows into the client sample and the delinquency table.
    ///
    /// The whole split fails on the first unparseable origination month, so
    /// callers never see a partially built client sample.
    pub fn split(records: &[RawRecord]) -> Result<SplitTables, DataError> {
        if records.is_empty() {
            return Err(DataError::EmptyInput);
        }

        let (clients, duplicates_collapsed) = Self::client_sample(records)?;
        let delinquency = Self::delinquency_table(records);

        info!(
            "split {} rows into {} clients and {} observations ({} duplicates collapsed)",
            records.len(),
            clients.len(),
            delinquency.len(),
            duplicates_collapsed
        );

        Ok(SplitTables {
            clients,
            delinquency,
            duplicates_collapsed,
        })
    }

    /// Distinct client tuples in first-seen order, plus the number of rows
    /// that repeated an earlier tuple.
    pub fn client_sample(records: &[RawRecord]) -> Result<(Vec<ClientRecord>, usize), DataError> {
        let mut seen: HashSet<ClientRecord> = HashSet::with_capacity(records.len());
        let mut clients = Vec::new();
        let mut duplicates = 0;

        for (i, record) in records.iter().enumerate() {
            let origination = OriginationMonth::parse(record.origination_month.trim())
                .map_err(|reason| DataError::Format {
                    line: i + 2,
                    column: COLUMNS[0],
                    value: record.origination_month.clone(),
                    reason: reason.to_string(),
                })?;

            let client = ClientRecord {
                client_id: ClientId(record.nb_clients.clone()),
                origination,
                score_band: ScoreBand(record.score_band_v2),
            };
            if seen.insert(client.clone()) {
                clients.push(client);
            } else {
                duplicates += 1;
            }
        }

        debug!("client sample: {} distinct tuples", clients.len());
        Ok((clients, duplicates))
    }

    /// One observation per raw row, in input order.
    pub fn delinquency_table(records: &[RawRecord]) -> Vec<DelinquencyObservation> {
        records
            .iter()
            .map(|r| DelinquencyObservation {
                months_since_origination: r.months_since_origination,
                clients_on_default: r.clients_on_default,
            })
            .collect()
    }
}
