//! Orderings over cost measurements and the per-phase acceptance rule.

use pt_types::{ComparisonError, CostMeasurement, Side};

use crate::config::ComparisonMode;
use crate::mutator::PhaseKind;

/// Decides whether a fresh measurement beats the incumbent optimum.
pub trait Comparator: Send + Sync {
    /// Strict improvement.
    fn better(
        &self,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError>;

    /// Improvement or tie.
    fn non_worse(
        &self,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError>;

    /// Human-readable comparator name.
    fn name(&self) -> &str;

    /// ADD phases must strictly improve; REMOVE phases may tie, so that equal
    /// cost favors the shorter pass list.
    fn accepts(
        &self,
        phase: PhaseKind,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError> {
        match phase {
            PhaseKind::Add => self.better(candidate, incumbent),
            PhaseKind::Remove => self.non_worse(candidate, incumbent),
        }
    }
}

pub fn comparator_for(mode: ComparisonMode) -> Box<dyn Comparator> {
    match mode {
        ComparisonMode::Scalar => Box::new(ScalarComparator),
        ComparisonMode::GeometricMean => Box::new(GeometricMeanComparator),
    }
}

// ---- Scalar ----

/// Lower single cost wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarComparator;

impl ScalarComparator {
    fn pair(
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<(f64, f64), ComparisonError> {
        match (candidate, incumbent) {
            (CostMeasurement::Scalar(a), CostMeasurement::Scalar(b)) => {
                Ok((check_scalar(*a, Side::Candidate)?, check_scalar(*b, Side::Incumbent)?))
            }
            _ => Err(ComparisonError::KindMismatch),
        }
    }
}

fn check_scalar(value: f64, side: Side) -> Result<f64, ComparisonError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ComparisonError::InvalidScalar { side, value })
    }
}

impl Comparator for ScalarComparator {
    fn better(
        &self,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError> {
        let (a, b) = Self::pair(candidate, incumbent)?;
        Ok(a < b)
    }

    fn non_worse(
        &self,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError> {
        let (a, b) = Self::pair(candidate, incumbent)?;
        Ok(a <= b)
    }

    fn name(&self) -> &str {
        "scalar"
    }
}

// ---- Geometric mean of ratios ----

/// Multi-metric ordering: the candidate wins when `Π candidateᵢ / incumbentᵢ < 1`.
///
/// Metrics count as independent multiplicative contributions, so a small
/// regression in one metric is accepted when another improves by more.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricMeanComparator;

impl GeometricMeanComparator {
    /// Product of per-metric ratios. Both sides must be vectors of the same
    /// non-zero length with strictly positive entries.
    pub fn ratio_product(
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<f64, ComparisonError> {
        if candidate.is_vector() != incumbent.is_vector() {
            return Err(ComparisonError::KindMismatch);
        }
        let a = candidate.values();
        let b = incumbent.values();
        if a.len() != b.len() {
            return Err(ComparisonError::LengthMismatch {
                candidate: a.len(),
                incumbent: b.len(),
            });
        }
        if a.is_empty() {
            return Err(ComparisonError::EmptyVector);
        }
        check_positive(a, Side::Candidate)?;
        check_positive(b, Side::Incumbent)?;

        Ok(a.iter().zip(b).map(|(x, y)| x / y).product())
    }
}

fn check_positive(values: &[f64], side: Side) -> Result<(), ComparisonError> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !(v.is_finite() && **v > 0.0))
    {
        Some((index, &value)) => Err(ComparisonError::NonPositive { side, index, value }),
        None => Ok(()),
    }
}

impl Comparator for GeometricMeanComparator {
    fn better(
        &self,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError> {
        Ok(Self::ratio_product(candidate, incumbent)? < 1.0)
    }

    fn non_worse(
        &self,
        candidate: &CostMeasurement,
        incumbent: &CostMeasurement,
    ) -> Result<bool, ComparisonError> {
        Ok(Self::ratio_product(candidate, incumbent)? <= 1.0)
    }

    fn name(&self) -> &str {
        "geometric-mean"
    }
}
