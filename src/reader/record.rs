use crate::literal::Literal;
use anyhow::bail;
use serde::Deserialize;
use std::fmt;

/// A record field, named as the simulator writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Application,
    AlgorithmName,
    PowerDipFraction,
    Size,
    Makespan,
    OptimalMakespan,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Application,
        Field::AlgorithmName,
        Field::PowerDipFraction,
        Field::Size,
        Field::Makespan,
        Field::OptimalMakespan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Application => "application",
            Field::AlgorithmName => "algorithmName",
            Field::PowerDipFraction => "powerDipFraction",
            Field::Size => "size",
            Field::Makespan => "makespan",
            Field::OptimalMakespan => "optimalMakespan",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Field::Application | Field::AlgorithmName)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One simulation run. Fields absent from the log stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub application: Option<String>,
    pub algorithm_name: Option<String>,
    pub power_dip_fraction: Option<f64>,
    pub size: Option<f64>,
    pub makespan: Option<f64>,
    pub optimal_makespan: Option<f64>,
}

/// Typed value of one field of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'r> {
    Text(&'r str),
    Number(f64),
}

impl Record {
    pub fn get(&self, field: Field) -> Option<FieldValue<'_>> {
        match field {
            Field::Application => self.application.as_deref().map(FieldValue::Text),
            Field::AlgorithmName => self.algorithm_name.as_deref().map(FieldValue::Text),
            Field::PowerDipFraction => self.power_dip_fraction.map(FieldValue::Number),
            Field::Size => self.size.map(FieldValue::Number),
            Field::Makespan => self.makespan.map(FieldValue::Number),
            Field::OptimalMakespan => self.optimal_makespan.map(FieldValue::Number),
        }
    }

    /// Set `key` from a parsed literal, rejecting unknown names, repeated
    /// fields and values of the wrong type.
    pub fn set(&mut self, key: &Literal, value: &Literal) -> anyhow::Result<()> {
        let Some(name) = key.as_str() else {
            bail!("record key must be a string, found {} {}", key.type_name(), key);
        };
        let Some(field) = Field::from_name(name) else {
            bail!(
                "unknown record field {:?} (expected one of: {})",
                name,
                Field::ALL.map(Field::name).join(", ")
            );
        };
        if self.get(field).is_some() {
            bail!("field {} given more than once", field);
        }

        match field {
            Field::Application => self.application = Some(text_value(field, value)?),
            Field::AlgorithmName => self.algorithm_name = Some(text_value(field, value)?),
            Field::PowerDipFraction => self.power_dip_fraction = Some(number_value(field, value)?),
            Field::Size => self.size = Some(number_value(field, value)?),
            Field::Makespan => self.makespan = Some(number_value(field, value)?),
            Field::OptimalMakespan => self.optimal_makespan = Some(number_value(field, value)?),
        }
        Ok(())
    }
}

fn text_value(field: Field, value: &Literal) -> anyhow::Result<String> {
    match value.as_str() {
        Some(text) => Ok(text.to_string()),
        None => bail!(
            "field {} needs a string, found {} {}",
            field,
            value.type_name(),
            value
        ),
    }
}

/// Numbers, or strings holding a number: the simulator writes `size` quoted.
fn number_value(field: Field, value: &Literal) -> anyhow::Result<f64> {
    let number = match value {
        Literal::Str(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    match number {
        Some(x) if x.is_finite() => Ok(x),
        _ => bail!(
            "field {} needs a number, found {} {}",
            field,
            value.type_name(),
            value
        ),
    }
}
