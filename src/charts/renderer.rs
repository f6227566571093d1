//! Static Chart Renderer
//! Draws the report charts to PNG files with plotters.
//!
//! Charts:
//! 1. Ribbon: mean clients on default per month since origination, with the
//!    min-max band shaded behind it
//! 2. Violin: mirrored density of clients on default per month, median tick
//! 3. Score bands: histogram of the client sample by score band

use crate::stats::{BandCount, GroupDistribution, MonthSummary};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const BAND_FILL: RGBColor = RGBColor(189, 215, 238);
const MEAN_LINE: RGBColor = RGBColor(91, 155, 213);
const THRESHOLD: RGBColor = RGBColor(156, 0, 6);
const VIOLIN_FILL: RGBColor = RGBColor(198, 224, 180);
const VIOLIN_EDGE: RGBColor = RGBColor(112, 173, 71);
const BAR_FILL: RGBColor = RGBColor(237, 125, 49);

/// Half of the horizontal slot a violin may occupy.
const VIOLIN_HALF_WIDTH: f64 = 0.4;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Nothing to plot for {0}")]
    NoData(&'static str),
    #[error("Failed to render {chart}: {message}")]
    Render {
        chart: &'static str,
        message: String,
    },
}

fn render_err<E: std::fmt::Display>(chart: &'static str) -> impl Fn(E) -> ChartError {
    move |e| ChartError::Render {
        chart,
        message: e.to_string(),
    }
}

/// Pixel size of each chart image.
#[derive(Debug, Clone, Copy)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
        }
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// X range covering every key with half a slot of padding each side.
    fn month_range(first: u32, last: u32) -> std::ops::Range<f64> {
        (first as f64 - 0.5)..(last as f64 + 0.5)
    }

    fn y_ceiling(max: f64) -> f64 {
        if max <= 0.0 {
            1.0
        } else {
            max * 1.1
        }
    }

    /// Mean line over a min-max ribbon, optionally marking the
    /// noncollectable threshold.
    pub fn render_ribbon(
        summaries: &[MonthSummary],
        path: &Path,
        size: ChartSize,
        noncollectable_after: Option<u32>,
    ) -> Result<(), ChartError> {
        const CHART: &str = "ribbon chart";
        let (Some(first), Some(last)) = (summaries.first(), summaries.last()) else {
            return Err(ChartError::NoData(CHART));
        };
        let err = render_err(CHART);

        let y_max = Self::y_ceiling(summaries.iter().map(|s| s.max).max().unwrap_or(0) as f64);
        let mut x_last = last.months_since_origination;
        if let Some(t) = noncollectable_after {
            x_last = x_last.max(t);
        }

        let root = BitMapBackend::new(path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Clients on default by months since origination", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                Self::month_range(first.months_since_origination, x_last),
                0f64..y_max,
            )
            .map_err(&err)?;

        chart
            .configure_mesh()
            .x_desc("Months since origination")
            .y_desc("Clients on default")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()
            .map_err(&err)?;

        let mut band: Vec<(f64, f64)> = summaries
            .iter()
            .map(|s| (s.months_since_origination as f64, s.max as f64))
            .collect();
        band.extend(
            summaries
                .iter()
                .rev()
                .map(|s| (s.months_since_origination as f64, s.min as f64)),
        );
        chart
            .draw_series(std::iter::once(Polygon::new(band, BAND_FILL.mix(0.6).filled())))
            .map_err(&err)?
            .label("min - max")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BAND_FILL.filled()));

        let mean_style = MEAN_LINE.stroke_width(2);
        let means: Vec<(f64, f64)> = summaries
            .iter()
            .map(|s| (s.months_since_origination as f64, s.mean))
            .collect();
        chart
            .draw_series(LineSeries::new(means.clone(), mean_style))
            .map_err(&err)?
            .label("mean")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], mean_style));
        chart
            .draw_series(
                means
                    .iter()
                    .map(|&point| Circle::new(point, 3, MEAN_LINE.filled())),
            )
            .map_err(&err)?;

        if let Some(t) = noncollectable_after {
            let style = THRESHOLD.stroke_width(1);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(t as f64, 0.0), (t as f64, y_max)],
                    style,
                )))
                .map_err(&err)?
                .label(format!("noncollectable after {t} months"))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()
            .map_err(&err)?;

        root.present().map_err(&err)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    /// One mirrored density outline per month group.
    pub fn render_violin(
        distributions: &[GroupDistribution],
        path: &Path,
        size: ChartSize,
    ) -> Result<(), ChartError> {
        const CHART: &str = "violin chart";
        let (Some(first), Some(last)) = (distributions.first(), distributions.last()) else {
            return Err(ChartError::NoData(CHART));
        };
        let err = render_err(CHART);

        let y_max = Self::y_ceiling(
            distributions
                .iter()
                .map(|d| d.max)
                .fold(0.0, f64::max),
        );

        let root = BitMapBackend::new(path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                "Distribution of clients on default by months since origination",
                ("sans-serif", 24),
            )
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                Self::month_range(first.months_since_origination, last.months_since_origination),
                0f64..y_max,
            )
            .map_err(&err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Months since origination")
            .y_desc("Clients on default")
            .x_label_formatter(&|x| format!("{:.0}", x))
            .draw()
            .map_err(&err)?;

        // Shared scale so widths are comparable across months.
        let peak = distributions
            .iter()
            .flat_map(|d| d.density.iter().map(|&(_, density)| density))
            .fold(0.0, f64::max);

        for dist in distributions {
            let cx = dist.months_since_origination as f64;

            if dist.density.is_empty() || peak <= 0.0 {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![
                            (cx - VIOLIN_HALF_WIDTH / 2.0, dist.median),
                            (cx + VIOLIN_HALF_WIDTH / 2.0, dist.median),
                        ],
                        VIOLIN_EDGE.stroke_width(2),
                    )))
                    .map_err(&err)?;
                continue;
            }

            let half = |density: f64| density / peak * VIOLIN_HALF_WIDTH;
            let mut outline: Vec<(f64, f64)> = dist
                .density
                .iter()
                .map(|&(y, density)| (cx - half(density), y))
                .collect();
            outline.extend(
                dist.density
                    .iter()
                    .rev()
                    .map(|&(y, density)| (cx + half(density), y)),
            );

            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline.clone(),
                    VIOLIN_FILL.mix(0.8).filled(),
                )))
                .map_err(&err)?;
            outline.push(outline[0]);
            chart
                .draw_series(std::iter::once(PathElement::new(outline, VIOLIN_EDGE)))
                .map_err(&err)?;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![
                        (cx - VIOLIN_HALF_WIDTH / 3.0, dist.median),
                        (cx + VIOLIN_HALF_WIDTH / 3.0, dist.median),
                    ],
                    BLACK.stroke_width(2),
                )))
                .map_err(&err)?;
        }

        root.present().map_err(&err)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    /// Histogram of the client sample by score band. Bars sit at their
    /// position in `counts` and carry the band as label, so sparse or very
    /// large band values never stretch the axis.
    pub fn render_score_bands(
        counts: &[BandCount],
        path: &Path,
        size: ChartSize,
    ) -> Result<(), ChartError> {
        const CHART: &str = "score band histogram";
        if counts.is_empty() {
            return Err(ChartError::NoData(CHART));
        }
        let err = render_err(CHART);

        let bars = Self::band_bars(counts);
        let top = bars.iter().map(|&(_, n)| n).max().unwrap_or(0);
        let band_label = |v: &SegmentValue<u32>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => counts
                .get(*i as usize)
                .map(|c| c.score_band.to_string())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };

        let root = BitMapBackend::new(path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE).map_err(&err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Clients by score band", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (0u32..clamp_count(counts.len())).into_segmented(),
                0u32..Self::count_ceiling(top),
            )
            .map_err(&err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(counts.len())
            .x_label_formatter(&band_label)
            .x_desc("Score band")
            .y_desc("Clients")
            .draw()
            .map_err(&err)?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BAR_FILL.filled())
                    .margin(8)
                    .data(bars),
            )
            .map_err(&err)?;

        root.present().map_err(&err)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    /// `(slot, clients)` per band, in band order.
    fn band_bars(counts: &[BandCount]) -> Vec<(u32, u32)> {
        counts
            .iter()
            .enumerate()
            .map(|(slot, c)| (clamp_count(slot), clamp_count(c.clients)))
            .collect()
    }

    fn count_ceiling(top: u32) -> u32 {
        top.saturating_add(top / 10).saturating_add(1)
    }
}

fn clamp_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_are_rejected_before_drawing() {
        let path = Path::new("unused.png");
        let size = ChartSize::default();

        assert!(matches!(
            StaticChartRenderer::render_ribbon(&[], path, size, None),
            Err(ChartError::NoData(_))
        ));
        assert!(matches!(
            StaticChartRenderer::render_violin(&[], path, size),
            Err(ChartError::NoData(_))
        ));
        assert!(matches!(
            StaticChartRenderer::render_score_bands(&[], path, size),
            Err(ChartError::NoData(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn x_range_pads_each_side() {
        let range = StaticChartRenderer::month_range(0, 15);
        assert_eq!(range.start, -0.5);
        assert_eq!(range.end, 15.5);
        assert_eq!(StaticChartRenderer::y_ceiling(0.0), 1.0);
        assert!((StaticChartRenderer::y_ceiling(10.0) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn extreme_band_values_stay_on_axis() {
        let counts = [
            BandCount {
                score_band: 0,
                clients: 3,
            },
            BandCount {
                score_band: u32::MAX,
                clients: 1,
            },
        ];
        assert_eq!(StaticChartRenderer::band_bars(&counts), vec![(0, 3), (1, 1)]);
        assert_eq!(StaticChartRenderer::count_ceiling(u32::MAX), u32::MAX);
        assert_eq!(StaticChartRenderer::count_ceiling(10), 12);
        assert_eq!(clamp_count(usize::MAX), u32::MAX);

        // Drawing may fail without system fonts, but must not panic.
        let dir = tempfile::tempdir().unwrap();
        let result = StaticChartRenderer::render_score_bands(
            &counts,
            &dir.path().join("bands.png"),
            ChartSize::default(),
        );
        assert!(!matches!(result, Err(ChartError::NoData(_))));
    }
}
