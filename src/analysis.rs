//! Analysis Module
//! Runs the pure part of the report: split, aggregate and breakdowns.

use crate::data::{DataError, DataProcessor, RawRecord, SplitTables};
use crate::stats::{BandCount, GroupDistribution, MonthSummary, StatsCalculator, YearCount};
use tracing::info;

/// Everything the report derives from one input file.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub raw_rows: usize,
    pub tables: SplitTables,
    pub summary: Vec<MonthSummary>,
    pub score_bands: Vec<BandCount>,
    pub origination_years: Vec<YearCount>,
    pub distributions: Vec<GroupDistribution>,
}

impl Analysis {
    pub fn from_records(records: &[RawRecord]) -> Result<Self, DataError> {
        let tables = DataProcessor::split(records)?;
        let summary = StatsCalculator::summarize(&tables.delinquency)?;
        let score_bands = StatsCalculator::score_band_counts(&tables.clients);
        let origination_years = StatsCalculator::origination_year_counts(&tables.clients);
        let distributions = StatsCalculator::distributions(&tables.delinquency);

        info!(
            "analysis ready: {} month groups, {} score bands, {} origination years",
            summary.len(),
            score_bands.len(),
            origination_years.len()
        );

        Ok(Self {
            raw_rows: records.len(),
            tables,
            summary,
            score_bands,
            origination_years,
            distributions,
        })
    }

    /// Summary row for one months-since-origination key.
    pub fn month(&self, months_since_origination: u32) -> Option<&MonthSummary> {
        self.summary
            .binary_search_by_key(&months_since_origination, |s| s.months_since_origination)
            .ok()
            .map(|idx| &self.summary[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rows_end_to_end() {
        let records = vec![
            RawRecord::new("2021-01", 3, "c1", 0, 10),
            RawRecord::new("2021-01", 3, "c1", 1, 15),
            RawRecord::new("2021-02", 5, "c2", 0, 8),
        ];
        let analysis = Analysis::from_records(&records).unwrap();

        assert_eq!(analysis.raw_rows, 3);
        assert_eq!(analysis.tables.clients.len(), 2);
        assert_eq!(analysis.tables.delinquency.len(), 3);

        let zero = analysis.month(0).unwrap();
        assert_eq!((zero.mean, zero.min, zero.max), (9.0, 8, 10));
        let one = analysis.month(1).unwrap();
        assert_eq!((one.mean, one.min, one.max), (15.0, 15, 15));
        assert!(analysis.month(2).is_none());

        assert_eq!(analysis.score_bands.len(), 2);
        assert_eq!(analysis.origination_years.len(), 1);
        assert_eq!(analysis.distributions.len(), 2);
    }

    #[test]
    fn malformed_month_yields_no_analysis() {
        let records = vec![
            RawRecord::new("2021-01", 3, "c1", 0, 10),
            RawRecord::new("2021/01", 3, "c2", 0, 4),
        ];
        assert!(matches!(
            Analysis::from_records(&records),
            Err(DataError::Format { .. })
        ));
    }
}
