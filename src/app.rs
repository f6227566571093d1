//! Report Application
//! Load, analyze, export and chart one extract.

use crate::analysis::Analysis;
use crate::charts::StaticChartRenderer;
use crate::data::load_records;
use crate::report::{format_summary_table, ReportWriter};
use crate::settings::ReportSettings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const RIBBON_PNG: &str = "ribbon.png";
pub const VIOLIN_PNG: &str = "violin.png";
pub const SCORE_BANDS_PNG: &str = "score_bands.png";

/// Run the whole report for `input`.
pub fn run(input: &Path, settings: &ReportSettings) -> Result<Analysis> {
    let records =
        load_records(input).with_context(|| format!("loading {}", input.display()))?;
    let analysis = Analysis::from_records(&records)
        .with_context(|| format!("analyzing {}", input.display()))?;

    let writer = ReportWriter::new(&settings.output_dir);
    writer
        .write_all(&analysis, input)
        .context("exporting report tables")?;

    if settings.charts {
        let charts = render_charts(&analysis, &writer, settings)?;
        info!("rendered {} charts", charts.len());
    }

    if settings.print_summary {
        print!("{}", format_summary_table(&analysis.summary));
    }

    Ok(analysis)
}

fn render_charts(
    analysis: &Analysis,
    writer: &ReportWriter,
    settings: &ReportSettings,
) -> Result<Vec<PathBuf>> {
    let size = settings.chart_size();

    let ribbon = writer.path(RIBBON_PNG);
    StaticChartRenderer::render_ribbon(
        &analysis.summary,
        &ribbon,
        size,
        settings.noncollectable_after,
    )?;

    let violin = writer.path(VIOLIN_PNG);
    StaticChartRenderer::render_violin(&analysis.distributions, &violin, size)?;

    let bands = writer.path(SCORE_BANDS_PNG);
    StaticChartRenderer::render_score_bands(&analysis.score_bands, &bands, size)?;

    Ok(vec![ribbon, violin, bands])
}
