//! Statistics Calculator Module
//! Per-month aggregates of clients on default, client sample breakdowns and
//! the kernel density estimates behind the violin chart.

use crate::data::{ClientRecord, DataError, DelinquencyObservation};
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::{Data, Median};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Last month offset the report expects to see. Larger offsets are kept as-is.
pub const EXPECTED_MAX_MONTH: u32 = 15;

/// Number of points sampled along each density curve.
pub const DENSITY_POINTS: usize = 64;

/// Aggregate of one months-since-origination group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub months_since_origination: u32,
    pub count: usize,
    pub mean: f64,
    pub min: u64,
    pub max: u64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandCount {
    pub score_band: u32,
    pub clients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub origination_year: i32,
    pub clients: usize,
}

/// Distribution of one group, shaped for the violin chart.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDistribution {
    pub months_since_origination: u32,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    /// `(value, density)` pairs over `[min, max]`; empty when the group has
    /// fewer than two observations or no spread.
    pub density: Vec<(f64, f64)>,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Group observations by months since origination. Unordered.
    fn group_by_month(observations: &[DelinquencyObservation]) -> HashMap<u32, Vec<u64>> {
        let mut groups: HashMap<u32, Vec<u64>> = HashMap::new();
        for obs in observations {
            groups
                .entry(obs.months_since_origination)
                .or_default()
                .push(obs.clients_on_default);
        }
        groups
    }

    fn warn_out_of_range(groups: &HashMap<u32, Vec<u64>>) {
        let mut beyond: Vec<u32> = groups
            .keys()
            .copied()
            .filter(|&m| m > EXPECTED_MAX_MONTH)
            .collect();
        if !beyond.is_empty() {
            beyond.sort_unstable();
            warn!(
                "months since origination beyond {}: {:?} (kept unmodified)",
                EXPECTED_MAX_MONTH, beyond
            );
        }
    }

    /// Compute mean/min/max (plus count and median) of a single group.
    /// `values` must not be empty.
    pub fn describe_group(months_since_origination: u32, values: &[u64]) -> MonthSummary {
        let count = values.len();
        let sum: u128 = values.iter().map(|&v| v as u128).sum();
        let mean = sum as f64 / count as f64;
        let min = values.iter().copied().min().unwrap_or_default();
        let max = values.iter().copied().max().unwrap_or_default();
        let median = Data::new(values.iter().map(|&v| v as f64).collect::<Vec<f64>>()).median();

        MonthSummary {
            months_since_origination,
            count,
            mean,
            min,
            max,
            median,
        }
    }

    /// Aggregate the delinquency table per months since origination.
    ///
    /// Groups are computed in parallel and then sorted by their numeric key,
    /// so the output order never depends on hashing.
    pub fn summarize(
        observations: &[DelinquencyObservation],
    ) -> Result<Vec<MonthSummary>, DataError> {
        if observations.is_empty() {
            return Err(DataError::EmptyInput);
        }

        let groups = Self::group_by_month(observations);
        Self::warn_out_of_range(&groups);

        let mut summaries: Vec<MonthSummary> = groups
            .par_iter()
            .map(|(&month, values)| Self::describe_group(month, values))
            .collect();
        summaries.sort_by_key(|s| s.months_since_origination);

        debug!("summarized {} month groups", summaries.len());
        Ok(summaries)
    }

    /// Client count per score band, ascending by band.
    pub fn score_band_counts(clients: &[ClientRecord]) -> Vec<BandCount> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for client in clients {
            *counts.entry(client.score_band.0).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(score_band, clients)| BandCount {
                score_band,
                clients,
            })
            .collect()
    }

    /// Client count per origination year, ascending by year.
    pub fn origination_year_counts(clients: &[ClientRecord]) -> Vec<YearCount> {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for client in clients {
            *counts.entry(client.origination_year()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(origination_year, clients)| YearCount {
                origination_year,
                clients,
            })
            .collect()
    }

    /// Gaussian kernel density estimate over `[min, max]` of `values`,
    /// using Silverman's rule of thumb for the bandwidth.
    pub fn kernel_density(values: &[f64], points: usize) -> Vec<(f64, f64)> {
        let n = values.len();
        if n < 2 {
            return Vec::new();
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std = variance.sqrt();
        if std == 0.0 || !std.is_finite() {
            return Vec::new();
        }

        let Ok(kernel) = Normal::new(0.0, 1.0) else {
            return Vec::new();
        };
        let bandwidth = 1.06 * std * (n as f64).powf(-0.2);
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let points = points.max(2);
        let step = (hi - lo) / (points - 1) as f64;

        (0..points)
            .map(|i| {
                let y = lo + step * i as f64;
                let density = values
                    .iter()
                    .map(|v| kernel.pdf((y - v) / bandwidth))
                    .sum::<f64>()
                    / (n as f64 * bandwidth);
                (y, density)
            })
            .collect()
    }

    /// Per-group distributions for the violin chart, ascending by key.
    pub fn distributions(observations: &[DelinquencyObservation]) -> Vec<GroupDistribution> {
        let groups = Self::group_by_month(observations);

        let mut out: Vec<GroupDistribution> = groups
            .par_iter()
            .map(|(&month, values)| {
                let values: Vec<f64> = values.iter().map(|&v| v as f64).collect();
                let density = Self::kernel_density(&values, DENSITY_POINTS);
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                GroupDistribution {
                    months_since_origination: month,
                    min,
                    max,
                    median: Data::new(values).median(),
                    density,
                }
            })
            .collect();
        out.sort_by_key(|d| d.months_since_origination);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClientId, OriginationMonth, ScoreBand};
    use std::collections::BTreeSet;

    fn obs(months_since_origination: u32, clients_on_default: u64) -> DelinquencyObservation {
        DelinquencyObservation {
            months_since_origination,
            clients_on_default,
        }
    }

    fn client(id: &str, month: &str, band: u32) -> ClientRecord {
        ClientRecord {
            client_id: ClientId(id.to_string()),
            origination: OriginationMonth::parse(month).unwrap(),
            score_band: ScoreBand(band),
        }
    }

    #[test]
    fn summarizes_sample_rows() {
        let summaries = StatsCalculator::summarize(&[obs(0, 10), obs(1, 15), obs(0, 8)]).unwrap();

        assert_eq!(summaries.len(), 2);
        let first = &summaries[0];
        assert_eq!(first.months_since_origination, 0);
        assert_eq!(first.count, 2);
        assert_eq!(first.mean, 9.0);
        assert_eq!(first.min, 8);
        assert_eq!(first.max, 10);
        assert_eq!(first.median, 9.0);
    }

    #[test]
    fn single_observation_group() {
        let summaries = StatsCalculator::summarize(&[obs(0, 5)]).unwrap();
        let only = &summaries[0];
        assert_eq!(only.mean, 5.0);
        assert_eq!(only.min, 5);
        assert_eq!(only.max, 5);
    }

    #[test]
    fn output_is_numerically_ordered() {
        let input: Vec<_> = [10, 2, 15, 0, 1, 11]
            .iter()
            .map(|&m| obs(m, m as u64))
            .collect();
        let keys: Vec<u32> = StatsCalculator::summarize(&input)
            .unwrap()
            .iter()
            .map(|s| s.months_since_origination)
            .collect();
        assert_eq!(keys, vec![0, 1, 2, 10, 11, 15]);
    }

    #[test]
    fn out_of_range_keys_pass_through() {
        let summaries = StatsCalculator::summarize(&[obs(3, 1), obs(42, 7)]).unwrap();
        let last = summaries.last().unwrap();
        assert_eq!(last.months_since_origination, 42);
        assert_eq!(last.mean, 7.0);
    }

    #[test]
    fn keys_round_trip_and_bounds_hold() {
        let input: Vec<_> = (0..200u64)
            .map(|i| obs((i * 7 % 16) as u32, (i * 31) % 97))
            .collect();
        let summaries = StatsCalculator::summarize(&input).unwrap();

        let expected: BTreeSet<u32> = input.iter().map(|o| o.months_since_origination).collect();
        let found: BTreeSet<u32> = summaries.iter().map(|s| s.months_since_origination).collect();
        assert_eq!(found, expected);

        for s in &summaries {
            assert!(s.min as f64 <= s.mean && s.mean <= s.max as f64, "{s:?}");
        }
        assert_eq!(
            summaries.iter().map(|s| s.count).sum::<usize>(),
            input.len()
        );
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            StatsCalculator::summarize(&[]),
            Err(DataError::EmptyInput)
        ));
    }

    #[test]
    fn counts_clients_by_band_and_year() {
        let clients = vec![
            client("a", "2020-11", 4),
            client("b", "2021-01", 2),
            client("c", "2021-03", 4),
        ];

        assert_eq!(
            StatsCalculator::score_band_counts(&clients),
            vec![
                BandCount {
                    score_band: 2,
                    clients: 1
                },
                BandCount {
                    score_band: 4,
                    clients: 2
                },
            ]
        );
        assert_eq!(
            StatsCalculator::origination_year_counts(&clients),
            vec![
                YearCount {
                    origination_year: 2020,
                    clients: 1
                },
                YearCount {
                    origination_year: 2021,
                    clients: 2
                },
            ]
        );
    }

    #[test]
    fn density_spans_observed_range() {
        let values = [1.0, 2.0, 2.0, 3.0, 8.0];
        let curve = StatsCalculator::kernel_density(&values, 20);

        assert_eq!(curve.len(), 20);
        assert_eq!(curve[0].0, 1.0);
        assert!((curve[19].0 - 8.0).abs() < 1e-9);
        assert!(curve.iter().all(|&(_, d)| d > 0.0));
    }

    #[test]
    fn degenerate_density_is_empty() {
        assert!(StatsCalculator::kernel_density(&[4.0], 10).is_empty());
        assert!(StatsCalculator::kernel_density(&[4.0, 4.0, 4.0], 10).is_empty());
    }

    #[test]
    fn distributions_follow_key_order() {
        let dists = StatsCalculator::distributions(&[obs(2, 4), obs(0, 1), obs(0, 3), obs(2, 4)]);

        assert_eq!(dists.len(), 2);
        assert_eq!(dists[0].months_since_origination, 0);
        assert_eq!(dists[0].median, 2.0);
        assert_eq!(dists[0].density.len(), DENSITY_POINTS);
        assert!(dists[1].density.is_empty());
        assert_eq!(dists[1].min, 4.0);
    }
}
