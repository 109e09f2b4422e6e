//! Report rendering — the comparison table and the throughput chart.
//!
//! The table always renders, even for an empty run. The chart covers only
//! the successful subset; when every band failed it is skipped with a log
//! line rather than an error. A rendering-backend failure, by contrast, is
//! the one failure in this tool worth surfacing to the caller.

use std::path::{Path, PathBuf};

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use plotters::prelude::*;

use bandbench_common::models::{MeasurementSample, RunReport, SampleStatus};

/// Placeholder for metric cells of bands that produced no measurement.
const PLACEHOLDER: &str = "-";

/// Render the comparison table. Always renders; an empty report yields a
/// single "no data" row.
pub fn render_table(report: &RunReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Band",
            "Download (Mbps)",
            "Upload (Mbps)",
            "Ping (ms)",
            "Status",
        ]);

    if report.is_empty() {
        table.add_row(vec!["no data", "", "", "", ""]);
    } else {
        for sample in report.samples() {
            table.add_row(sample_row(sample));
        }
    }

    format!(
        "Band test report — started {}\n{table}\nLower ping is steadier; higher download/upload is faster.",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn sample_row(sample: &MeasurementSample) -> Vec<Cell> {
    let metric = |value: f64, precision: usize| {
        let cell = if sample.status == SampleStatus::Success {
            Cell::new(format!("{value:.precision$}"))
        } else {
            Cell::new(PLACEHOLDER)
        };
        cell.set_alignment(CellAlignment::Right)
    };
    vec![
        Cell::new(&sample.band),
        metric(sample.download_mbps, 2),
        metric(sample.upload_mbps, 2),
        metric(sample.latency_ms, 0),
        Cell::new(sample.status.to_string()),
    ]
}

/// Render the grouped download/upload bar chart over the successful subset.
///
/// Returns `Ok(None)` without touching the filesystem when no band produced
/// a successful measurement.
pub fn render_chart(report: &RunReport, path: &Path) -> anyhow::Result<Option<PathBuf>> {
    let successes: Vec<&MeasurementSample> = report.successes().collect();
    if successes.is_empty() {
        tracing::info!("no successful samples, skipping chart");
        return Ok(None);
    }

    let labels: Vec<String> = successes.iter().map(|s| s.band.clone()).collect();
    let y_max = successes
        .iter()
        .map(|s| s.download_mbps.max(s.upload_mbps))
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.15;

    let root = SVGBackend::new(path, (960, 540)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("chart backend: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Throughput by band", ("sans-serif", 28))
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(48)
        .build_cartesian_2d(0.0..successes.len() as f64, 0.0..y_max)
        .map_err(|e| anyhow::anyhow!("chart layout: {e}"))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(successes.len())
        .x_label_formatter(&|x| {
            labels
                .get(x.floor() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc("Mbps")
        .draw()
        .map_err(|e| anyhow::anyhow!("chart mesh: {e}"))?;

    let download_bars = successes.iter().enumerate().map(|(i, s)| {
        let x = i as f64;
        Rectangle::new([(x + 0.15, 0.0), (x + 0.48, s.download_mbps)], BLUE.filled())
    });
    chart
        .draw_series(download_bars)
        .map_err(|e| anyhow::anyhow!("chart series: {e}"))?
        .label("Download (Mbps)")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE.filled()));

    let upload_bars = successes.iter().enumerate().map(|(i, s)| {
        let x = i as f64;
        Rectangle::new([(x + 0.52, 0.0), (x + 0.85, s.upload_mbps)], RED.filled())
    });
    chart
        .draw_series(upload_bars)
        .map_err(|e| anyhow::anyhow!("chart series: {e}"))?
        .label("Upload (Mbps)")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], RED.filled()));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(|e| anyhow::anyhow!("chart legend: {e}"))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("chart write: {e}"))?;
    Ok(Some(path.to_path_buf()))
}
