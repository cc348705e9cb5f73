use crate::model::Series;
use crate::render::{ChartOptions, OutputFormat};

use anyhow::{Context, anyhow};
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::fs;
use std::path::Path;
use svg2pdf::usvg;

const COLORS: [RGBColor; 3] = [RED, GREEN, BLUE];
const MARKERS: [Marker; 3] = [Marker::Cross, Marker::Circle, Marker::Dot];
const FONT: &str = "sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Scatter,
    /// Right-continuous steps: each value holds until the next point.
    Step,
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Cross,
    Circle,
    Dot,
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// Names the output file; empty for a run's only chart.
    pub label: String,
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

type Ctx<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Draw `chart` into `path`; the image format follows the extension.
pub fn render_to_file(chart: &ChartSpec, options: &ChartOptions, path: &Path) -> anyhow::Result<()> {
    let format = OutputFormat::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }

    let transparent = options.transparent && format.has_alpha();
    if options.transparent && !transparent {
        log::warn!(
            "{} has no alpha channel, drawing {} on white",
            format.extension(),
            path.display()
        );
    }

    let size = (options.width, options.height);
    let drawn = match format {
        OutputFormat::Svg => draw(
            SVGBackend::new(path, size).into_drawing_area(),
            chart,
            options,
            transparent,
        ),
        OutputFormat::Pdf => {
            let mut svg = String::new();
            draw(
                SVGBackend::with_string(&mut svg, size).into_drawing_area(),
                chart,
                options,
                transparent,
            )
            .and_then(|()| pdf_from_svg(&svg))
            .and_then(|pdf| Ok(fs::write(path, pdf)?))
        }
        OutputFormat::Png | OutputFormat::Bmp | OutputFormat::Jpeg => draw(
            BitMapBackend::new(path, size).into_drawing_area(),
            chart,
            options,
            transparent,
        ),
    };
    drawn.with_context(|| format!("render chart {}", path.display()))
}

fn pdf_from_svg(svg: &str) -> anyhow::Result<Vec<u8>> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &opt).context("parse drawn svg")?;
    svg2pdf::to_pdf(&tree, svg2pdf::ConversionOptions::default(), svg2pdf::PageOptions::default())
        .map_err(|e| anyhow!("convert svg to pdf: {:?}", e))
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    chart: &ChartSpec,
    options: &ChartOptions,
    transparent: bool,
) -> anyhow::Result<()>
where
    DB::ErrorType: 'static,
{
    if transparent {
        root.fill(&TRANSPARENT)?;
    } else {
        root.fill(&WHITE)?;
    }

    let (x_lo, x_hi) = options
        .x_range
        .unwrap_or_else(|| data_range(chart.series.iter().flat_map(|s| s.points.iter().map(|p| p.0))));
    let (y_lo, y_hi) = options
        .y_range
        .unwrap_or_else(|| data_range(chart.series.iter().flat_map(|s| s.points.iter().map(|p| p.1))));

    let (margin, label_area) = if options.tight { (5, 35) } else { (20, 50) };
    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(margin)
        .x_label_area_size(label_area)
        .y_label_area_size(label_area + 10);
    if !chart.title.is_empty() {
        builder.caption(&chart.title, (FONT, 20));
    }
    let mut ctx = builder.build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .label_style((FONT, 14))
        .draw()?;

    for (i, series) in chart.series.iter().enumerate() {
        let color = COLORS[i % COLORS.len()];
        match chart.kind {
            ChartKind::Scatter => draw_markers(&mut ctx, series, color, MARKERS[i % MARKERS.len()])?,
            ChartKind::Step => {
                ctx.draw_series(LineSeries::new(step_path(&series.points), color.stroke_width(2)))?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
            }
        }
    }

    if options.legend && !chart.series.is_empty() {
        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, 14))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_markers<DB: DrawingBackend>(
    ctx: &mut Ctx<'_, DB>,
    series: &Series,
    color: RGBColor,
    marker: Marker,
) -> anyhow::Result<()>
where
    DB::ErrorType: 'static,
{
    let points = series.points.iter().copied();
    let label = series.label.as_str();
    match marker {
        Marker::Cross => {
            ctx.draw_series(points.map(|p| Cross::new(p, 4, color.stroke_width(1))))?
                .label(label)
                .legend(move |p| Cross::new(p, 4, color.stroke_width(1)));
        }
        Marker::Circle => {
            ctx.draw_series(points.map(|p| Circle::new(p, 4, color.stroke_width(1))))?
                .label(label)
                .legend(move |p| Circle::new(p, 4, color.stroke_width(1)));
        }
        Marker::Dot => {
            ctx.draw_series(points.map(|p| Circle::new(p, 2, color.filled())))?
                .label(label)
                .legend(move |p| Circle::new(p, 2, color.filled()));
        }
    }
    Ok(())
}

/// Corner points tracing a right-continuous step function through `points`:
/// every value holds horizontally until the next point's x.
pub fn step_path(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut path = Vec::with_capacity(points.len() * 2);
    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            path.push((x, points[i - 1].1));
        }
        path.push((x, y));
    }
    path
}

/// Data extent padded by 5% each side. A single value gets a unit-wide
/// window, no data at all gets [0, 1].
fn data_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}
