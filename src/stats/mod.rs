//! Stats module - Monthly aggregates and distributions

mod calculator;

pub use calculator::{
    BandCount, GroupDistribution, MonthSummary, StatsCalculator, YearCount, DENSITY_POINTS,
    EXPECTED_MAX_MONTH,
};
