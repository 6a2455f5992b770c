//! Prediction validation against expected outputs.
//!
//! Replays of exported validation samples are compared pairwise against the
//! predictions recorded at training time, classifying each row and
//! aggregating the usual regression metrics.

use serde::Serialize;

/// How a prediction compared against its expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Match {
    /// Bit-identical.
    Exact,
    /// Within tolerance.
    Close,
    /// Outside tolerance.
    Diff,
}

/// One compared prediction.
#[derive(Debug, Serialize)]
pub struct PredictionRow {
    pub index: usize,
    pub predicted: f64,
    pub expected: f64,
    pub error: f64,
    pub outcome: Match,
}

/// Pairwise comparison result with aggregate metrics.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub rows: Vec<PredictionRow>,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub exact: usize,
    pub close: usize,
    pub diff: usize,
    pub tolerance: f64,
}

impl ValidationReport {
    /// Number of compared rows.
    pub fn samples(&self) -> usize {
        self.rows.len()
    }

    /// Whether every prediction landed within tolerance.
    pub fn all_within_tolerance(&self) -> bool {
        self.diff == 0
    }
}

/// Compare predictions against expected values pairwise.
///
/// Only the overlapping prefix is compared when the lengths differ.
pub fn compare_predictions(
    predicted: &[f64],
    expected: &[f64],
    tolerance: f64,
) -> ValidationReport {
    let count = predicted.len().min(expected.len());
    let mut rows = Vec::with_capacity(count);
    let mut total_squared = 0.0;
    let mut total_abs = 0.0;
    let (mut exact, mut close, mut diff) = (0, 0, 0);

    for index in 0..count {
        let error = predicted[index] - expected[index];
        let abs_error = error.abs();
        total_squared += error * error;
        total_abs += abs_error;

        let outcome = if abs_error == 0.0 {
            exact += 1;
            Match::Exact
        } else if abs_error < tolerance {
            close += 1;
            Match::Close
        } else {
            diff += 1;
            Match::Diff
        };

        rows.push(PredictionRow {
            index,
            predicted: predicted[index],
            expected: expected[index],
            error,
            outcome,
        });
    }

    let (mse, rmse, mae) = if count == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let mse = total_squared / count as f64;
        (mse, mse.sqrt(), total_abs / count as f64)
    };

    ValidationReport {
        rows,
        mse,
        rmse,
        mae,
        exact,
        close,
        diff,
        tolerance,
    }
}
