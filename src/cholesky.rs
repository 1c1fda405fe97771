//! A module for Cholesky factorization of possibly ill-conditioned
//! covariance matrices.
//!
//! Correlation matrices discretized on closely spaced or duplicated sample
//! points lose positive definiteness to machine precision. The factorizer
//! below retries a failed factorization after adding a small ridge to the
//! diagonal, doubling the ridge on every new failure, within a bounded
//! cumulative budget.

use crate::errors::{Result, UqError};
use linfa::Float;
use linfa_linalg::cholesky::*;
use ndarray::{Array2, ArrayBase, Data, Ix2};

/// Default first ridge added to the diagonal on factorization failure
pub const DEFAULT_STARTING_SCALING: f64 = 1e-13;
/// Default bound on the cumulated ridge
pub const DEFAULT_MAXIMAL_SCALING: f64 = 1e-5;

/// Ridge-regularized Cholesky factorization policy.
#[derive(Clone, Debug, PartialEq)]
pub struct RegularizedCholesky<F: Float> {
    starting_scaling: F,
    maximal_scaling: F,
}

impl<F: Float> Default for RegularizedCholesky<F> {
    fn default() -> Self {
        RegularizedCholesky {
            starting_scaling: F::cast(DEFAULT_STARTING_SCALING),
            maximal_scaling: F::cast(DEFAULT_MAXIMAL_SCALING),
        }
    }
}

/// A successful factorization together with its regularization record.
#[derive(Clone, Debug)]
pub struct CholeskyFactor<F: Float> {
    /// Lower triangular factor of the (possibly ridged) matrix
    pub lower: Array2<F>,
    /// Total ridge added to the diagonal, 0 when the matrix factorized as
    /// given
    pub cumulated_scaling: F,
    /// Number of factorization attempts performed
    pub attempts: usize,
}

impl<F: Float> RegularizedCholesky<F> {
    /// Set the first ridge value (must be positive).
    pub fn starting_scaling(mut self, starting_scaling: F) -> Self {
        self.starting_scaling = starting_scaling;
        self
    }

    /// Set the bound on the cumulated ridge (must be positive).
    pub fn maximal_scaling(mut self, maximal_scaling: F) -> Self {
        self.maximal_scaling = maximal_scaling;
        self
    }

    /// Compute a lower-triangular factor `L` with `L * L^T` equal to `r`
    /// plus whatever diagonal ridge was needed.
    ///
    /// `r` must be square and symmetric; symmetry is the caller's contract.
    /// The first attempt is made on `r` as given; each retry adds the
    /// current scaling to every diagonal entry before factorizing again and
    /// doubles it for the next round. Exceeding the cumulative budget is the
    /// only hard failure.
    pub fn factorize(&self, r: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<CholeskyFactor<F>> {
        if self.starting_scaling <= F::zero() || self.maximal_scaling <= F::zero() {
            return Err(UqError::InvalidArgument(format!(
                "Cholesky scalings must be positive, got starting {:?} and maximal {:?}",
                self.starting_scaling, self.maximal_scaling
            )));
        }
        if !r.is_square() {
            return Err(UqError::InvalidArgument(format!(
                "Cholesky factorization expects a square matrix, got {:?}",
                r.dim()
            )));
        }

        let mut work = r.to_owned();
        let mut scaling = self.starting_scaling;
        let mut cumulated_scaling = F::zero();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match work.cholesky() {
                Ok(lower) => {
                    if cumulated_scaling > F::zero() {
                        log::warn!(
                            "correlation matrix regularized: cumulated diagonal scaling \
                             {cumulated_scaling:?} after {attempts} attempts"
                        );
                    }
                    return Ok(CholeskyFactor {
                        lower,
                        cumulated_scaling,
                        attempts,
                    });
                }
                Err(_) => {
                    if cumulated_scaling + scaling > self.maximal_scaling {
                        return Err(UqError::NumericalFailure {
                            cumulated_scaling: num_traits::cast(cumulated_scaling)
                                .unwrap_or(f64::NAN),
                            maximal_scaling: num_traits::cast(self.maximal_scaling)
                                .unwrap_or(f64::NAN),
                        });
                    }
                    work.diag_mut().mapv_inplace(|v| v + scaling);
                    cumulated_scaling += scaling;
                    scaling *= F::cast(2.);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_well_conditioned_needs_no_regularization() {
        let r = array![[4., 2., 0.6], [2., 2., 0.4], [0.6, 0.4, 1.]];
        let factor = RegularizedCholesky::default()
            .factorize(&r)
            .expect("factorization");
        assert_eq!(factor.attempts, 1);
        assert_eq!(factor.cumulated_scaling, 0.);
        let reconstructed = factor.lower.dot(&factor.lower.t());
        assert_abs_diff_eq!(reconstructed, r, epsilon = 1e-10);
    }

    #[test]
    fn test_rank_deficient_is_regularized() {
        // Duplicated row: exactly singular
        let r = array![[1., 1., 0.], [1., 1., 0.], [0., 0., 1.]];
        let factor = RegularizedCholesky::default()
            .factorize(&r)
            .expect("factorization");
        assert!(factor.cumulated_scaling > 0.);
        assert!(factor.attempts > 1);
        // L * L^T reconstructs the ridged matrix, not the original
        let mut ridged = r.clone();
        ridged
            .diag_mut()
            .mapv_inplace(|v| v + factor.cumulated_scaling);
        let reconstructed = factor.lower.dot(&factor.lower.t());
        assert_abs_diff_eq!(reconstructed, ridged, epsilon = 1e-10);
    }

    #[test]
    fn test_budget_exhaustion_reports_scaling() {
        let r = array![[1., 1.], [1., 1.]];
        let result = RegularizedCholesky::default()
            .starting_scaling(1e-13)
            .maximal_scaling(1e-13 / 2.)
            .factorize(&r);
        match result {
            Err(UqError::NumericalFailure {
                cumulated_scaling,
                maximal_scaling,
            }) => {
                assert_eq!(cumulated_scaling, 0.);
                assert_eq!(maximal_scaling, 1e-13 / 2.);
            }
            other => panic!("expected NumericalFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let r = array![[1., 0.], [0., 1.]];
        assert!(RegularizedCholesky::default()
            .starting_scaling(0.)
            .factorize(&r)
            .is_err());
        let rect = array![[1., 0., 0.], [0., 1., 0.]];
        assert!(RegularizedCholesky::default().factorize(&rect).is_err());
    }
}
