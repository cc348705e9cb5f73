//! Power-trace logs: one piecewise-constant function per line,
//! `('power used', 0.000000, {12.000000:40.000000, 30.000000:0.000000, })`.

use crate::literal::{Literal, parse_literal};
use anyhow::{Context, anyhow, bail};
use std::fs;

/// A named step function: `initial` until the first jump, then each jump's
/// value until the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerTrace {
    pub label: String,
    pub initial: f64,
    /// Sorted by time, one entry per time.
    pub jumps: Vec<(f64, f64)>,
}

impl PowerTrace {
    pub fn new(label: impl Into<String>, initial: f64, mut jumps: Vec<(f64, f64)>) -> Self {
        // Stable sort keeps source order among equal times, so the last
        // assignment to a time wins, as in a mapping literal.
        jumps.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(jumps.len());
        for (time, value) in jumps {
            match deduped.last_mut() {
                Some(last) if last.0 == time => last.1 = value,
                _ => deduped.push((time, value)),
            }
        }
        Self {
            label: label.into(),
            initial,
            jumps: deduped,
        }
    }

    /// Build from a `(label, initial_value, {time: value, ...})` literal.
    pub fn from_literal(lit: &Literal) -> anyhow::Result<Self> {
        let Literal::Tuple(items) = lit else {
            bail!(
                "expected a (label, initial_value, jumps) tuple, found {}",
                lit.type_name()
            );
        };
        let [label, initial, jumps] = items.as_slice() else {
            bail!(
                "expected a (label, initial_value, jumps) tuple, found {} element(s)",
                items.len()
            );
        };

        let label = label
            .as_str()
            .ok_or_else(|| anyhow!("trace label must be a string, found {}", label.type_name()))?;
        let initial = initial.as_f64().ok_or_else(|| {
            anyhow!(
                "initial value of {:?} must be a number, found {}",
                label,
                initial.type_name()
            )
        })?;
        let Literal::Dict(entries) = jumps else {
            bail!(
                "jumps of {:?} must be a mapping, found {}",
                label,
                jumps.type_name()
            );
        };

        let mut parsed = Vec::with_capacity(entries.len());
        for (time, value) in entries {
            match (time.as_f64(), value.as_f64()) {
                (Some(t), Some(v)) => parsed.push((t, v)),
                _ => bail!(
                    "jump {}: {} of {:?} must map a number to a number",
                    time,
                    value,
                    label
                ),
            }
        }

        Ok(Self::new(label, initial, parsed))
    }

    pub fn last_jump_time(&self) -> Option<f64> {
        self.jumps.last().map(|(t, _)| *t)
    }

    /// Corner points of the step function from time 0 to `max_time`:
    /// `(0, initial)`, every jump, then `(max_time, last value)` so that all
    /// traces of one file end at the same time.
    pub fn step_points(&self, max_time: f64) -> Vec<(f64, f64)> {
        let mut points = Vec::with_capacity(self.jumps.len() + 2);
        points.push((0.0, self.initial));
        points.extend(self.jumps.iter().copied());
        let last = self.jumps.last().map_or(self.initial, |(_, v)| *v);
        points.push((max_time, last));
        points
    }
}

/// Latest jump time across all traces; 0 when nothing ever jumps.
pub fn max_jump_time(traces: &[PowerTrace]) -> f64 {
    traces
        .iter()
        .filter_map(PowerTrace::last_jump_time)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

pub fn read_power_file(path: &str) -> anyhow::Result<Vec<PowerTrace>> {
    let text = fs::read_to_string(path).with_context(|| format!("read power log {}", path))?;
    let traces = parse_power_traces(&text, path)?;
    log::debug!("{}: {} trace(s)", path, traces.len());
    Ok(traces)
}

/// Parse power log text; `origin` only labels error messages.
pub fn parse_power_traces(text: &str, origin: &str) -> anyhow::Result<Vec<PowerTrace>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let lno = lineno + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let lit = parse_literal(line)
            .with_context(|| format!("power log parse error at {}:{}", origin, lno))?;
        let trace = PowerTrace::from_literal(&lit)
            .with_context(|| format!("bad power trace at {}:{}", origin, lno))?;
        out.push(trace);
    }
    Ok(out)
}
