//! Missingness mask generation.
//!
//! A cell is kept when `round(r + 0.5 - missing_rate)` equals one, where `r`
//! is the uniform random draw assigned to it. Under the non-random scenario
//! one draw per `(location, day)` pair decides the whole time-of-day fibre,
//! which models sensor outages. Under the random scenario every cell has its
//! own draw.

use crate::data::{Dataset, Tensor3};
use crate::error::{GainError, Result};
use crate::types::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy used to derive the binary observation tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingScenario {
    /// Independent missingness per cell.
    Random,
    /// Missingness shared along the time axis for every `(i, j)` pair.
    #[default]
    NonRandom,
}

impl fmt::Display for MissingScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::NonRandom => write!(f, "non-random"),
        }
    }
}

impl FromStr for MissingScenario {
    type Err = GainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" | "rm" => Ok(Self::Random),
            "non-random" | "nonrandom" | "nm" => Ok(Self::NonRandom),
            other => Err(GainError::invalid_configuration(
                "missing_scenario",
                other,
                "expected `random` or `non-random`",
            )),
        }
    }
}

/// Checks that a missing rate lies in `[0, 1)`.
pub fn validate_missing_rate(missing_rate: f64) -> Result<()> {
    if !(0.0..1.0).contains(&missing_rate) {
        return Err(GainError::invalid_configuration(
            "missing_rate",
            missing_rate,
            "must lie in [0, 1)",
        ));
    }
    Ok(())
}

/// Keep/drop decision for one random draw: 1.0 when observed, 0.0 otherwise.
///
/// Rounds half away from zero, so a zero missing rate never drops a cell.
#[inline]
pub fn keep_decision(random_value: f64, missing_rate: f64) -> f64 {
    if (random_value + 0.5 - missing_rate).round() >= 1.0 {
        1.0
    } else {
        0.0
    }
}

/// Binary observation tensor for the given scenario.
pub fn binary_tensor(
    dataset: &Dataset,
    scenario: MissingScenario,
    missing_rate: f64,
) -> Result<Tensor3> {
    validate_missing_rate(missing_rate)?;
    let shape = dataset.tensor.shape();
    let binary = match scenario {
        MissingScenario::NonRandom => Tensor3::from_fn(shape, |i, j, _| {
            keep_decision(dataset.random_matrix[(i, j)], missing_rate)
        }),
        MissingScenario::Random => dataset
            .random_tensor
            .map(|r| keep_decision(r, missing_rate)),
    };
    Ok(binary)
}

/// Mode-0 unfolded observation mask `M` matching [`Dataset::matrix`].
pub fn observation_mask(
    dataset: &Dataset,
    scenario: MissingScenario,
    missing_rate: f64,
) -> Result<Matrix> {
    binary_tensor(dataset, scenario, missing_rate)?.unfold(0)
}

/// Observed entries retained, missing entries zeroed.
pub fn sparse_matrix(mat: &Matrix, mask: &Matrix) -> Result<Matrix> {
    ensure_same_shape("sparse matrix", mat, mask)?;
    Ok(mat.component_mul(mask))
}

/// `1 - M`.
pub fn complement(mask: &Matrix) -> Matrix {
    mask.map(|m| 1.0 - m)
}

/// Returns an error unless both matrices have the same shape.
pub fn ensure_same_shape(context: &str, expected: &Matrix, actual: &Matrix) -> Result<()> {
    if expected.shape() != actual.shape() {
        return Err(GainError::shape_mismatch(
            context,
            crate::types::shape_of(expected),
            crate::types::shape_of(actual),
        ));
    }
    Ok(())
}

/// Summary counts for a mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskStatistics {
    /// Number of cells equal to one
    pub observed: usize,
    /// Number of cells equal to zero
    pub missing: usize,
}

impl MaskStatistics {
    /// Counts the observed and missing cells of `mask`.
    pub fn from_mask(mask: &Matrix) -> Self {
        let observed = mask.iter().filter(|&&m| m != 0.0).count();
        Self {
            observed,
            missing: mask.len() - observed,
        }
    }

    /// Total number of cells.
    pub fn total(&self) -> usize {
        self.observed + self.missing
    }

    /// `mean(M)`.
    pub fn observed_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.observed as f64 / self.total() as f64
        }
    }

    /// `mean(1 - M)`.
    pub fn missing_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.missing as f64 / self.total() as f64
        }
    }
}

impl fmt::Display for MaskStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observed {} / missing {} ({:.2}% observed)",
            self.observed,
            self.missing,
            100.0 * self.observed_ratio()
        )
    }
}

/// Rejects masks for which `mean(M)` or `mean(1 - M)` is zero.
pub fn validate_mask(mask: &Matrix) -> Result<MaskStatistics> {
    let stats = MaskStatistics::from_mask(mask);
    if stats.observed == 0 {
        return Err(GainError::degenerate_mask(
            "mean(M) == 0: no observed cells to train on",
        ));
    }
    if stats.missing == 0 {
        return Err(GainError::degenerate_mask(
            "mean(1 - M) == 0: no missing cells to impute",
        ));
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_decision_boundaries() {
        assert_eq!(keep_decision(0.0, 0.0), 1.0);
        assert_eq!(keep_decision(0.999, 0.0), 1.0);
        assert_eq!(keep_decision(0.1, 0.2), 0.0);
        assert_eq!(keep_decision(0.3, 0.2), 1.0);
        assert_eq!(keep_decision(0.0, 0.9), 0.0);
    }

    #[test]
    fn test_zero_missing_rate_is_all_ones() {
        let dataset = Dataset::synthetic([4, 5, 6], 3).unwrap();
        for scenario in [MissingScenario::Random, MissingScenario::NonRandom] {
            let mask = observation_mask(&dataset, scenario, 0.0).unwrap();
            assert!(mask.iter().all(|&m| m == 1.0));
        }
    }

    #[test]
    fn test_mask_values_are_binary() {
        let dataset = Dataset::synthetic([5, 5, 8], 11).unwrap();
        let mask = observation_mask(&dataset, MissingScenario::Random, 0.4).unwrap();
        assert!(mask.iter().all(|&m| m == 0.0 || m == 1.0));
    }

    #[test]
    fn test_invalid_missing_rate() {
        let dataset = Dataset::synthetic([2, 2, 2], 0).unwrap();
        assert!(observation_mask(&dataset, MissingScenario::NonRandom, 1.0).is_err());
        assert!(observation_mask(&dataset, MissingScenario::NonRandom, -0.1).is_err());
    }

    #[test]
    fn test_validate_mask_degenerate() {
        let ones = Matrix::from_element(3, 4, 1.0);
        assert!(matches!(
            validate_mask(&ones),
            Err(GainError::DegenerateMask { .. })
        ));
        let zeros = Matrix::zeros(3, 4);
        assert!(matches!(
            validate_mask(&zeros),
            Err(GainError::DegenerateMask { .. })
        ));

        let mut mixed = Matrix::from_element(2, 2, 1.0);
        mixed[(0, 1)] = 0.0;
        let stats = validate_mask(&mixed).unwrap();
        assert_eq!(stats.observed, 3);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.observed_ratio(), 0.75);
    }

    #[test]
    fn test_scenario_parsing() {
        assert_eq!("random".parse::<MissingScenario>().unwrap(), MissingScenario::Random);
        assert_eq!("NM".parse::<MissingScenario>().unwrap(), MissingScenario::NonRandom);
        assert!("sometimes".parse::<MissingScenario>().is_err());
        assert_eq!(MissingScenario::NonRandom.to_string(), "non-random");
    }
}
