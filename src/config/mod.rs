//! Plot configuration: JSON schema + validated in-memory options.
//!
//! Every key is optional; an absent file means all defaults.
//!
//! JSON shape:
//! {
//!   "chart":    { "title": "...", "x_label": "...", "y_label": "...",
//!                 "x_range": [lo, hi], "y_range": [lo, hi], "legend": true,
//!                 "width": 800, "height": 600, "transparent": false,
//!                 "tight": false, "format": "svg" },  // svg, pdf, png, bmp, jpg
//!   "grouping": { "figure_key": "application", "series_key": "powerDipFraction",
//!                 "x_key": "size", "metric": "slr", "aggregate": "mean" },
//!   "ratio":    { "numerator": "HEFT", "denominator": "FCFS",
//!                 "algorithm_key": "algorithmName", "metric": "makespan" }
//! }

use crate::model::{Aggregate, AggregationPlan, Metric, RatioPlan};
use crate::reader::Field;
use crate::render::{ChartOptions, OutputFormat};
use crate::Result;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs;

pub const DEFAULT_NUMERATOR: &str = "HEFT";
pub const DEFAULT_DENOMINATOR: &str = "FCFS";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub chart: RawChart,

    #[serde(default)]
    pub grouping: RawGrouping,

    #[serde(default)]
    pub ratio: RawRatio,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawChart {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_range: Option<[f64; 2]>,
    pub y_range: Option<[f64; 2]>,
    pub legend: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub transparent: Option<bool>,
    pub tight: Option<bool>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGrouping {
    pub figure_key: Option<Field>,
    pub series_key: Option<Field>,
    pub x_key: Option<Field>,
    pub metric: Option<Metric>,
    pub aggregate: Option<Aggregate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRatio {
    pub numerator: Option<String>,
    pub denominator: Option<String>,
    pub algorithm_key: Option<Field>,
    pub metric: Option<Metric>,
}

/// Validated configuration shared by all subcommands.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub chart: ChartOptions,
    pub grouping: AggregationPlan,
    pub ratio: RatioPlan,
}

impl RawConfig {
    /// Read a config file, or all defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<RawConfig> {
        let Some(path) = path else {
            return Ok(RawConfig::default());
        };
        let text = fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parse config file {}", path))
    }

    /// Fill defaults and check that the options make sense together.
    pub fn validate_and_build(&self) -> Result<PlotConfig> {
        let chart = self.chart.validate_and_build()?;

        let g = &self.grouping;
        let grouping = AggregationPlan {
            figure_key: g.figure_key.unwrap_or(Field::Application),
            series_key: g.series_key.unwrap_or(Field::PowerDipFraction),
            x_key: g.x_key.unwrap_or(Field::Size),
            metric: g.metric.unwrap_or(Metric::Slr),
            aggregate: g.aggregate.unwrap_or(Aggregate::Mean),
        };
        let keys = [grouping.figure_key, grouping.series_key, grouping.x_key];
        if has_duplicates(&keys) {
            bail!(
                "grouping keys must differ, got figure_key={}, series_key={}, x_key={}",
                grouping.figure_key,
                grouping.series_key,
                grouping.x_key
            );
        }
        if !grouping.x_key.is_numeric() {
            bail!("x_key must be a numeric field, got {}", grouping.x_key);
        }

        let r = &self.ratio;
        let ratio = RatioPlan {
            figure_key: grouping.figure_key,
            series_key: grouping.series_key,
            algorithm_key: r.algorithm_key.unwrap_or(Field::AlgorithmName),
            x_key: grouping.x_key,
            metric: r.metric.unwrap_or(Metric::Makespan),
            numerator: non_empty("ratio.numerator", r.numerator.as_deref(), DEFAULT_NUMERATOR)?,
            denominator: non_empty("ratio.denominator", r.denominator.as_deref(), DEFAULT_DENOMINATOR)?,
        };
        if keys.contains(&ratio.algorithm_key) {
            bail!(
                "ratio.algorithm_key {} is already used as a grouping key",
                ratio.algorithm_key
            );
        }
        if ratio.numerator == ratio.denominator {
            bail!(
                "ratio numerator and denominator are both {:?}",
                ratio.numerator
            );
        }

        Ok(PlotConfig {
            chart,
            grouping,
            ratio,
        })
    }
}

impl RawChart {
    fn validate_and_build(&self) -> Result<ChartOptions> {
        let defaults = ChartOptions::default();

        let width = self.width.unwrap_or(defaults.width);
        let height = self.height.unwrap_or(defaults.height);
        if width == 0 || height == 0 {
            bail!("chart size must be non-zero, got {}x{}", width, height);
        }

        let format = match &self.format {
            Some(ext) => OutputFormat::from_extension(ext)?,
            None => defaults.format,
        };

        Ok(ChartOptions {
            title: self.title.clone(),
            x_label: self.x_label.clone(),
            y_label: self.y_label.clone(),
            x_range: checked_range("x_range", self.x_range)?,
            y_range: checked_range("y_range", self.y_range)?,
            legend: self.legend.unwrap_or(defaults.legend),
            width,
            height,
            transparent: self.transparent.unwrap_or(defaults.transparent),
            tight: self.tight.unwrap_or(defaults.tight),
            format,
        })
    }
}

fn checked_range(name: &str, range: Option<[f64; 2]>) -> Result<Option<(f64, f64)>> {
    let Some([lo, hi]) = range else {
        return Ok(None);
    };
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        bail!("{} must be [low, high] with low < high, got [{}, {}]", name, lo, hi);
    }
    Ok(Some((lo, hi)))
}

fn non_empty(name: &str, value: Option<&str>, default: &str) -> Result<String> {
    let value = value.unwrap_or(default).trim();
    if value.is_empty() {
        bail!("{} must not be empty", name);
    }
    Ok(value.to_string())
}

fn has_duplicates(fields: &[Field]) -> bool {
    fields
        .iter()
        .enumerate()
        .any(|(i, f)| fields[i + 1..].contains(f))
}
