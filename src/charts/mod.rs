//! Charts module - Static chart rendering

mod renderer;

pub use renderer::{ChartError, ChartSize, StaticChartRenderer};
