//! Turns parsed logs into charts and writes them out.

use crate::config::PlotConfig;
use crate::model::{self, Figure, Series, Skipped};
use crate::reader::{PowerTrace, Record, max_jump_time};
use crate::render::{self, ChartKind, ChartOptions, ChartSpec, Output, OutputFormat};
use crate::Result;

use std::path::PathBuf;

/// One scatter chart per figure key: metric against x, one series per
/// series key.
pub fn metric_charts(records: &[Record], config: &PlotConfig) -> Result<Vec<ChartSpec>> {
    let plan = &config.grouping;
    let figures = model::metric_figures(records, plan)?;
    Ok(figure_charts(
        figures,
        &config.chart,
        &plan.x_key.to_string(),
        &plan.metric.to_string(),
    ))
}

/// One scatter chart per figure key: numerator / denominator of the mean
/// metric against x. Comparisons that could not be made are returned too.
pub fn ratio_charts(records: &[Record], config: &PlotConfig) -> Result<(Vec<ChartSpec>, Vec<Skipped>)> {
    let plan = &config.ratio;
    let out = model::ratio_figures(records, plan)?;
    let y_label = format!("{} ratio {} / {}", plan.metric, plan.numerator, plan.denominator);
    let charts = figure_charts(out.figures, &config.chart, &plan.x_key.to_string(), &y_label);
    Ok((charts, out.skipped))
}

/// All traces of one power log as steps over a shared time window.
pub fn power_chart(traces: &[PowerTrace], name: &str, options: &ChartOptions) -> ChartSpec {
    let max_time = max_jump_time(traces);
    let series = traces
        .iter()
        .map(|t| Series {
            label: t.label.clone(),
            points: t.step_points(max_time),
        })
        .collect();

    ChartSpec {
        label: String::new(),
        title: options.title.clone().unwrap_or_else(|| name.to_string()),
        kind: ChartKind::Step,
        x_label: options.x_label.clone().unwrap_or_else(|| "time".to_string()),
        y_label: options.y_label.clone().unwrap_or_else(|| "power".to_string()),
        series,
    }
}

fn figure_charts(
    figures: Vec<Figure>,
    options: &ChartOptions,
    x_label: &str,
    y_label: &str,
) -> Vec<ChartSpec> {
    let x_label = options.x_label.clone().unwrap_or_else(|| x_label.to_string());
    let y_label = options.y_label.clone().unwrap_or_else(|| y_label.to_string());

    // No data still yields one (empty) chart.
    if figures.is_empty() {
        return vec![ChartSpec {
            label: String::new(),
            title: options.title.clone().unwrap_or_default(),
            kind: ChartKind::Scatter,
            x_label,
            y_label,
            series: Vec::new(),
        }];
    }

    figures
        .into_iter()
        .map(|figure| ChartSpec {
            title: match &options.title {
                Some(title) => format!("{}: {}", title, figure.label),
                None => figure.label.clone(),
            },
            label: figure.label,
            kind: ChartKind::Scatter,
            x_label: x_label.clone(),
            y_label: y_label.clone(),
            series: figure.series,
        })
        .collect()
}

/// Render every chart to its output path and return the paths written.
pub fn emit(charts: &[ChartSpec], options: &ChartOptions, output: &Output) -> Result<Vec<PathBuf>> {
    let format = match output {
        Output::File(path) => OutputFormat::from_path(path)?,
        Output::Show | Output::Prefix(_) => options.format,
    };

    let mut written = Vec::with_capacity(charts.len());
    for chart in charts {
        let path = output.path_for(&chart.label, format);
        render::render_to_file(chart, options, &path)?;
        println!("Wrote {}", path.display());
        if *output == Output::Show {
            render::open_in_viewer(&path);
        }
        written.push(path);
    }
    Ok(written)
}
