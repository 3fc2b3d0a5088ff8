use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result of one oracle evaluation. Lower is better in every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CostMeasurement {
    /// Single figure, e.g. elapsed cycles.
    Scalar(f64),
    /// Independent metrics in a fixed order, e.g. instructions and cache misses.
    Vector(Vec<f64>),
}

impl CostMeasurement {
    /// All components in order; a scalar is a one-element slice.
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Vector(vs) => vs,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector(_))
    }

    /// Parse the fields at `indices` out of one line of delimited text.
    ///
    /// A single index yields a scalar, several yield a vector in index order.
    /// Values must be finite and non-negative.
    pub fn parse_fields(
        line: &str,
        delimiter: char,
        indices: &[usize],
    ) -> Result<Self, CostParseError> {
        if indices.is_empty() {
            return Err(CostParseError::NoFields);
        }

        let fields: Vec<&str> = line.trim().split(delimiter).map(str::trim).collect();
        let mut values = Vec::with_capacity(indices.len());
        for &index in indices {
            let raw = fields.get(index).ok_or(CostParseError::MissingField {
                index,
                available: fields.len(),
            })?;
            let value: f64 = raw.parse().map_err(|_| CostParseError::NotANumber {
                index,
                raw: raw.to_string(),
            })?;
            if !value.is_finite() || value < 0.0 {
                return Err(CostParseError::OutOfRange { index, value });
            }
            values.push(value);
        }

        Ok(if values.len() == 1 {
            Self::Scalar(values[0])
        } else {
            Self::Vector(values)
        })
    }
}

impl fmt::Display for CostMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Vector(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Why a line of benchmark output could not be read as a cost.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CostParseError {
    #[error("no cost fields configured")]
    NoFields,

    #[error("field {index} missing: output has {available} field(s)")]
    MissingField { index: usize, available: usize },

    #[error("field {index} is not a number: {raw:?}")]
    NotANumber { index: usize, raw: String },

    #[error("field {index} out of range: {value}")]
    OutOfRange { index: usize, value: f64 },
}
