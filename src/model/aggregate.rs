use crate::reader::{Field, Record};
use crate::model::group::{GroupTree, group_nested};
use anyhow::{anyhow, bail};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// The quantity plotted on the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Schedule length ratio: makespan / optimal makespan.
    Slr,
    Makespan,
}

impl Metric {
    pub fn value(self, record: &Record) -> anyhow::Result<f64> {
        let makespan = record
            .makespan
            .ok_or_else(|| anyhow!("record has no makespan: {:?}", record))?;
        match self {
            Metric::Makespan => Ok(makespan),
            Metric::Slr => {
                let optimal = record
                    .optimal_makespan
                    .ok_or_else(|| anyhow!("record has no optimalMakespan: {:?}", record))?;
                if optimal == 0.0 {
                    bail!("optimalMakespan is zero, SLR undefined: {:?}", record);
                }
                Ok(makespan / optimal)
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Slr => f.write_str("SLR"),
            Metric::Makespan => f.write_str("makespan"),
        }
    }
}

/// How the points of one series are formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// One point per x value, holding the mean metric.
    Mean,
    /// One point per record.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// One chart's worth of series.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub label: String,
    pub series: Vec<Series>,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPlan {
    pub figure_key: Field,
    pub series_key: Field,
    pub x_key: Field,
    pub metric: Metric,
    pub aggregate: Aggregate,
}

/// One figure per figure key, one series per series key, metric against x.
pub fn metric_figures(records: &[Record], plan: &AggregationPlan) -> anyhow::Result<Vec<Figure>> {
    let tree = group_nested(records.iter().collect(), &[plan.figure_key, plan.series_key, plan.x_key])?;

    let mut figures = Vec::new();
    for (figure_key, figure_tree) in tree.children() {
        let mut series = Vec::new();
        for (series_key, series_tree) in figure_tree.children() {
            let points = match plan.aggregate {
                Aggregate::Mean => mean_points(series_tree, plan.metric)?,
                Aggregate::None => raw_points(series_tree, plan.metric)?,
            };
            series.push(Series {
                label: series_key.to_string(),
                points,
            });
        }
        figures.push(Figure {
            label: figure_key.to_string(),
            series,
        });
    }
    Ok(figures)
}

/// `tree` is grouped by the x field; one (x, mean metric) point per group.
fn mean_points(tree: &GroupTree<'_>, metric: Metric) -> anyhow::Result<Vec<(f64, f64)>> {
    let mut points = Vec::new();
    for (x_key, x_tree) in tree.children() {
        let x = x_key
            .as_number()
            .ok_or_else(|| anyhow!("x values must be numbers, found {:?}", x_key.to_string()))?;
        let values = x_tree
            .records()
            .iter()
            .map(|r| metric.value(r))
            .collect::<anyhow::Result<Vec<f64>>>()?;
        if let Some(y) = mean(&values) {
            points.push((x, y));
        }
    }
    Ok(points)
}

fn raw_points(tree: &GroupTree<'_>, metric: Metric) -> anyhow::Result<Vec<(f64, f64)>> {
    let mut points = Vec::new();
    for (x_key, x_tree) in tree.children() {
        let x = x_key
            .as_number()
            .ok_or_else(|| anyhow!("x values must be numbers, found {:?}", x_key.to_string()))?;
        for record in x_tree.records() {
            points.push((x, metric.value(record)?));
        }
    }
    Ok(points)
}

/// Why an algorithm comparison was left out of a ratio chart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("no algorithm matches {selector:?} (have: {})", .available.join(", "))]
    MissingAlgorithm {
        selector: String,
        available: Vec<String>,
    },

    #[error("{selector:?} matches several algorithms: {}", .matches.join(", "))]
    AmbiguousAlgorithm {
        selector: String,
        matches: Vec<String>,
    },

    #[error("numerator and denominator both select {name:?}")]
    SameAlgorithm { name: String },

    #[error("sizes differ: {numerator:?} vs {denominator:?}")]
    SizeMismatch {
        numerator: Vec<f64>,
        denominator: Vec<f64>,
    },

    #[error("denominator mean is zero at size {size}")]
    ZeroDenominator { size: f64 },
}

/// A comparison that was skipped, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub figure: String,
    pub series: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioPlan {
    pub figure_key: Field,
    pub series_key: Field,
    pub algorithm_key: Field,
    pub x_key: Field,
    pub metric: Metric,
    pub numerator: String,
    pub denominator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioFigures {
    pub figures: Vec<Figure>,
    pub skipped: Vec<Skipped>,
}

/// Pointwise `numerator / denominator` of two `(size, mean)` lists.
///
/// After sorting by size, both lists must hold exactly the same sizes.
pub fn ratio_series(
    numerator: &[(f64, f64)],
    denominator: &[(f64, f64)],
) -> Result<Vec<(f64, f64)>, SkipReason> {
    let mut numerator = numerator.to_vec();
    let mut denominator = denominator.to_vec();
    numerator.sort_by(|a, b| a.0.total_cmp(&b.0));
    denominator.sort_by(|a, b| a.0.total_cmp(&b.0));

    let sizes = |points: &[(f64, f64)]| points.iter().map(|(s, _)| *s).collect::<Vec<f64>>();
    let (numerator_sizes, denominator_sizes) = (sizes(&numerator), sizes(&denominator));
    if numerator_sizes != denominator_sizes {
        return Err(SkipReason::SizeMismatch {
            numerator: numerator_sizes,
            denominator: denominator_sizes,
        });
    }

    numerator
        .iter()
        .zip(&denominator)
        .map(|(&(size, n), &(_, d))| {
            if d == 0.0 {
                Err(SkipReason::ZeroDenominator { size })
            } else {
                Ok((size, n / d))
            }
        })
        .collect()
}

/// Index of the algorithm `selector` names: an exact match if there is one,
/// otherwise the single name containing it.
fn select_algorithm(selector: &str, names: &[String]) -> Result<usize, SkipReason> {
    if let Some(exact) = names.iter().position(|n| n == selector) {
        return Ok(exact);
    }
    let matches: Vec<usize> = (0..names.len())
        .filter(|&i| names[i].contains(selector))
        .collect();
    match matches.as_slice() {
        [] => Err(SkipReason::MissingAlgorithm {
            selector: selector.to_string(),
            available: names.to_vec(),
        }),
        [only] => Ok(*only),
        _ => Err(SkipReason::AmbiguousAlgorithm {
            selector: selector.to_string(),
            matches: matches.iter().map(|&i| names[i].clone()).collect(),
        }),
    }
}

/// Ratio of the mean metric of two algorithms against size, per figure and
/// series key. Comparisons that cannot be made are logged and collected in
/// `skipped`; they never fail the run.
pub fn ratio_figures(records: &[Record], plan: &RatioPlan) -> anyhow::Result<RatioFigures> {
    let fields = [plan.figure_key, plan.series_key, plan.algorithm_key, plan.x_key];
    let tree = group_nested(records.iter().collect(), &fields)?;

    let mut figures = Vec::new();
    let mut skipped = Vec::new();
    for (figure_key, figure_tree) in tree.children() {
        let mut series = Vec::new();
        for (series_key, series_tree) in figure_tree.children() {
            let mut names = Vec::new();
            let mut means = Vec::new();
            for (algorithm, algorithm_tree) in series_tree.children() {
                names.push(algorithm.to_string());
                means.push(mean_points(algorithm_tree, plan.metric)?);
            }

            let outcome = select_algorithm(&plan.numerator, &names).and_then(|num| {
                let den = select_algorithm(&plan.denominator, &names)?;
                if num == den {
                    return Err(SkipReason::SameAlgorithm {
                        name: names[num].clone(),
                    });
                }
                ratio_series(&means[num], &means[den])
            });

            match outcome {
                Ok(points) => series.push(Series {
                    label: series_key.to_string(),
                    points,
                }),
                Err(reason) => {
                    log::warn!(
                        "skipping {} {} / {} {}: {}",
                        plan.figure_key,
                        figure_key,
                        plan.series_key,
                        series_key,
                        reason
                    );
                    skipped.push(Skipped {
                        figure: figure_key.to_string(),
                        series: series_key.to_string(),
                        reason,
                    });
                }
            }
        }
        figures.push(Figure {
            label: figure_key.to_string(),
            series,
        });
    }

    Ok(RatioFigures { figures, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(app: &str, alg: &str, dip: f64, size: f64, makespan: f64, optimal: f64) -> Record {
        Record {
            application: Some(app.into()),
            algorithm_name: Some(alg.into()),
            power_dip_fraction: Some(dip),
            size: Some(size),
            makespan: Some(makespan),
            optimal_makespan: Some(optimal),
        }
    }

    fn slr_plan(aggregate: Aggregate) -> AggregationPlan {
        AggregationPlan {
            figure_key: Field::Application,
            series_key: Field::PowerDipFraction,
            x_key: Field::Size,
            metric: Metric::Slr,
            aggregate,
        }
    }

    fn ratio_plan() -> RatioPlan {
        RatioPlan {
            figure_key: Field::Application,
            series_key: Field::PowerDipFraction,
            algorithm_key: Field::AlgorithmName,
            x_key: Field::Size,
            metric: Metric::Makespan,
            numerator: "HEFT".into(),
            denominator: "FCFS".into(),
        }
    }

    #[test]
    fn mean_of_one_is_that_value() {
        assert_eq!(mean(&[3.5]), Some(3.5));
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn slr_metric() {
        let r = run("A", "X", 0.5, 10.0, 150.0, 100.0);
        assert_eq!(Metric::Slr.value(&r).unwrap(), 1.5);
        assert_eq!(Metric::Makespan.value(&r).unwrap(), 150.0);

        let zero = run("A", "X", 0.5, 10.0, 150.0, 0.0);
        assert!(Metric::Slr.value(&zero).is_err());
        assert!(Metric::Slr.value(&Record::default()).is_err());
    }

    #[test]
    fn slr_figures_average_per_size() {
        let records = vec![
            run("Montage", "X", 0.5, 10.0, 150.0, 100.0),
            run("Montage", "X", 0.5, 10.0, 250.0, 100.0),
            run("Montage", "X", 0.5, 20.0, 120.0, 100.0),
            run("Montage", "X", 0.25, 10.0, 100.0, 100.0),
            run("Sipht", "X", 0.5, 30.0, 300.0, 200.0),
        ];
        let figures = metric_figures(&records, &slr_plan(Aggregate::Mean)).unwrap();
        assert_eq!(
            figures,
            vec![
                Figure {
                    label: "Montage".into(),
                    series: vec![
                        Series {
                            label: "0.25".into(),
                            points: vec![(10.0, 1.0)],
                        },
                        Series {
                            label: "0.5".into(),
                            points: vec![(10.0, 2.0), (20.0, 1.2)],
                        },
                    ],
                },
                Figure {
                    label: "Sipht".into(),
                    series: vec![Series {
                        label: "0.5".into(),
                        points: vec![(30.0, 1.5)],
                    }],
                },
            ]
        );
    }

    #[test]
    fn raw_aggregate_keeps_every_run() {
        let records = vec![
            run("Montage", "X", 0.5, 10.0, 150.0, 100.0),
            run("Montage", "X", 0.5, 10.0, 250.0, 100.0),
        ];
        let figures = metric_figures(&records, &slr_plan(Aggregate::None)).unwrap();
        assert_eq!(figures[0].series[0].points, vec![(10.0, 1.5), (10.0, 2.5)]);
    }

    #[test]
    fn text_x_values_are_rejected() {
        let records = vec![run("Montage", "X", 0.5, 10.0, 150.0, 100.0)];
        let plan = AggregationPlan {
            x_key: Field::AlgorithmName,
            ..slr_plan(Aggregate::Mean)
        };
        let err = metric_figures(&records, &plan).unwrap_err();
        assert!(err.to_string().contains("x values must be numbers"));
    }

    #[test]
    fn no_records_no_figures() {
        assert!(metric_figures(&[], &slr_plan(Aggregate::Mean)).unwrap().is_empty());
    }

    #[test]
    fn aligned_sizes_give_pointwise_ratio() {
        let numerator = [(10.0, 100.0), (20.0, 200.0), (30.0, 300.0)];
        let denominator = [(10.0, 50.0), (20.0, 100.0), (30.0, 150.0)];
        let ratio = ratio_series(&numerator, &denominator).unwrap();
        assert_eq!(ratio, vec![(10.0, 2.0), (20.0, 2.0), (30.0, 2.0)]);
    }

    #[test]
    fn ratio_aligns_after_sorting() {
        let numerator = [(30.0, 300.0), (10.0, 100.0)];
        let denominator = [(10.0, 50.0), (30.0, 100.0)];
        let ratio = ratio_series(&numerator, &denominator).unwrap();
        assert_eq!(ratio, vec![(10.0, 2.0), (30.0, 3.0)]);
    }

    #[test]
    fn mismatched_sizes_are_skipped() {
        let numerator = [(10.0, 100.0), (20.0, 200.0)];
        let denominator = [(10.0, 50.0), (30.0, 150.0)];
        assert_eq!(
            ratio_series(&numerator, &denominator),
            Err(SkipReason::SizeMismatch {
                numerator: vec![10.0, 20.0],
                denominator: vec![10.0, 30.0],
            })
        );
        assert_eq!(
            ratio_series(&[(10.0, 1.0)], &[(10.0, 0.0)]),
            Err(SkipReason::ZeroDenominator { size: 10.0 })
        );
    }

    #[test]
    fn algorithm_selection() {
        let names = vec![
            "FCFSPowerCapped".to_string(),
            "HEFT".to_string(),
            "HEFTPowerCapped".to_string(),
        ];
        assert_eq!(select_algorithm("HEFT", &names), Ok(1));
        assert_eq!(select_algorithm("FCFS", &names), Ok(0));
        assert!(matches!(
            select_algorithm("PowerCapped", &names),
            Err(SkipReason::AmbiguousAlgorithm { .. })
        ));
        assert!(matches!(
            select_algorithm("MinMin", &names),
            Err(SkipReason::MissingAlgorithm { .. })
        ));
    }

    #[test]
    fn selectors_resolving_to_one_algorithm_are_skipped() {
        let records = vec![
            run("Montage", "HEFT", 0.5, 10.0, 100.0, 1.0),
            run("Montage", "FCFS", 0.5, 10.0, 50.0, 1.0),
        ];
        let plan = RatioPlan {
            denominator: "EFT".into(),
            ..ratio_plan()
        };

        let out = ratio_figures(&records, &plan).unwrap();

        assert!(out.figures[0].series.is_empty());
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(
            out.skipped[0].reason,
            SkipReason::SameAlgorithm {
                name: "HEFT".into()
            }
        );
    }

    #[test]
    fn ratio_figures_compute_and_skip() {
        let records = vec![
            // Montage 0.5: aligned sizes, HEFT twice as long.
            run("Montage", "HEFT", 0.5, 10.0, 100.0, 1.0),
            run("Montage", "HEFT", 0.5, 20.0, 200.0, 1.0),
            run("Montage", "HEFT", 0.5, 20.0, 200.0, 1.0),
            run("Montage", "FCFS", 0.5, 10.0, 50.0, 1.0),
            run("Montage", "FCFS", 0.5, 20.0, 100.0, 1.0),
            // Montage 0.25: FCFS lacks size 20.
            run("Montage", "HEFT", 0.25, 10.0, 100.0, 1.0),
            run("Montage", "HEFT", 0.25, 20.0, 100.0, 1.0),
            run("Montage", "FCFS", 0.25, 10.0, 100.0, 1.0),
            // Sipht 0.5: no FCFS at all.
            run("Sipht", "HEFT", 0.5, 10.0, 100.0, 1.0),
        ];

        let out = ratio_figures(&records, &ratio_plan()).unwrap();

        assert_eq!(out.figures.len(), 2);
        assert_eq!(
            out.figures[0],
            Figure {
                label: "Montage".into(),
                series: vec![Series {
                    label: "0.5".into(),
                    points: vec![(10.0, 2.0), (20.0, 2.0)],
                }],
            }
        );
        assert!(out.figures[1].series.is_empty());

        assert_eq!(out.skipped.len(), 2);
        assert_eq!(out.skipped[0].figure, "Montage");
        assert_eq!(out.skipped[0].series, "0.25");
        assert!(matches!(
            out.skipped[0].reason,
            SkipReason::SizeMismatch { .. }
        ));
        assert_eq!(out.skipped[1].figure, "Sipht");
        assert!(matches!(
            out.skipped[1].reason,
            SkipReason::MissingAlgorithm { .. }
        ));
    }
}
