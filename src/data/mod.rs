//! Data module - CSV loading and table splitting

mod loader;
mod processor;

pub use loader::{load_records, DataError, DataLoader, RawRecord, COLUMNS};
pub use processor::{
    ClientId, ClientRecord, DataProcessor, DelinquencyObservation, MonthParseError,
    OriginationMonth, ScoreBand, SplitTables,
};
