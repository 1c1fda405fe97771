//! A module for adaptive numerical integration with embedded
//! Gauss-Kronrod rules.
//!
//! The integrator bisects the interval carrying the largest local error
//! estimate until the global error estimate falls below the requested
//! tolerance or the sub-interval budget is exhausted. The integrand is a
//! batched scalar function: each rule application evaluates all
//! `2 * order + 1` points in a single call, so callers may parallelize or
//! vectorize their function internally.

use crate::errors::{Result, UqError};
use crate::rules::GaussKronrodRule;
use linfa::Float;
use ndarray::{s, Array1};

/// Default sub-interval budget of the adaptive algorithm
pub const DEFAULT_MAX_SUB_INTERVALS: usize = 100;
/// Default target absolute error
pub const DEFAULT_MAX_ERROR: f64 = 1e-10;

/// Fraction of the target error below which refinement stops
const CONVERGENCE_FACTOR: f64 = 0.25;

/// An adaptive Gauss-Kronrod integrator.
///
/// # Example
///
/// ```
/// use uqbox::quadrature::GaussKronrod;
///
/// let quad = GaussKronrod::<f64>::default();
/// let result = quad
///     .integrate(|x| x.mapv(f64::sin), 0., std::f64::consts::PI)
///     .expect("integration");
/// assert!((result.value - 2.).abs() < 1e-10);
/// ```
#[derive(Clone, Debug)]
pub struct GaussKronrod<F: Float> {
    rule: GaussKronrodRule,
    maximum_sub_intervals: usize,
    maximum_error: F,
}

impl<F: Float> Default for GaussKronrod<F> {
    fn default() -> Self {
        GaussKronrod::new(GaussKronrodRule::default())
    }
}

/// The outcome of one adaptive integration.
///
/// The per-sub-interval arrays are trimmed to the number of sub-intervals
/// actually used and sorted by left bound; together the sub-intervals form a
/// contiguous, non-overlapping cover of the integration interval. They are
/// exposed so callers can reuse the partition, e.g. for interpolation of the
/// primitive.
#[derive(Clone, Debug)]
pub struct QuadratureResult<F: Float> {
    /// Integral estimate (signed according to bound orientation)
    pub value: F,
    /// Achieved global error estimate (L2 norm of the local errors)
    pub error: F,
    /// Left bound of each sub-interval
    pub lower_bounds: Array1<F>,
    /// Right bound of each sub-interval
    pub upper_bounds: Array1<F>,
    /// Rule value of each sub-interval
    pub contributions: Array1<F>,
    /// Local error estimate of each sub-interval
    pub errors: Array1<F>,
}

impl<F: Float> GaussKronrod<F> {
    /// Build an integrator from a rule table with default budget and
    /// tolerance.
    pub fn new(rule: GaussKronrodRule) -> Self {
        GaussKronrod {
            rule,
            maximum_sub_intervals: DEFAULT_MAX_SUB_INTERVALS,
            maximum_error: F::cast(DEFAULT_MAX_ERROR),
        }
    }

    /// Set the sub-interval budget (must be at least 1).
    pub fn maximum_sub_intervals(mut self, maximum_sub_intervals: usize) -> Self {
        self.maximum_sub_intervals = maximum_sub_intervals;
        self
    }

    /// Set the target absolute error (must be non-negative).
    pub fn maximum_error(mut self, maximum_error: F) -> Self {
        self.maximum_error = maximum_error;
        self
    }

    /// Get the rule table in use
    pub fn rule(&self) -> &GaussKronrodRule {
        &self.rule
    }

    /// Approximate the integral of `f` over `[a, b]`.
    ///
    /// `f` maps a batch of scalar abscissas to the batch of corresponding
    /// scalar values; it is called once per rule application with exactly
    /// `2 * order + 1` points. A returned batch of a different length is an
    /// [`UqError::InvalidArgument`] detected on the first evaluation.
    ///
    /// Exhausting the sub-interval budget before reaching the tolerance is
    /// not an error: the best estimate found is returned together with the
    /// achieved error, and a warning states achieved vs requested error.
    pub fn integrate<Func>(&self, f: Func, a: F, b: F) -> Result<QuadratureResult<F>>
    where
        Func: Fn(&Array1<F>) -> Array1<F>,
    {
        if self.maximum_sub_intervals < 1 {
            return Err(UqError::InvalidArgument(
                "maximum_sub_intervals must be at least 1".to_string(),
            ));
        }
        if self.maximum_error < F::zero() {
            return Err(UqError::InvalidArgument(format!(
                "maximum_error must be non-negative, got {:?}",
                self.maximum_error
            )));
        }
        if !a.is_finite() || !b.is_finite() {
            return Err(UqError::InvalidArgument(format!(
                "integration bounds must be finite, got [{a:?}, {b:?}]"
            )));
        }

        let (lower, upper, negate) = if a <= b { (a, b, false) } else { (b, a, true) };

        let max = self.maximum_sub_intervals;
        let mut ai = Array1::<F>::zeros(max);
        let mut bi = Array1::<F>::zeros(max);
        let mut fi = Array1::<F>::zeros(max);
        let mut ei = Array1::<F>::zeros(max);

        ai[0] = lower;
        bi[0] = upper;
        let (value0, error0) = self.compute_rule(&f, lower, upper)?;
        fi[0] = value0;
        ei[0] = error0;
        let mut used = 1;
        let mut value = value0;
        let mut error = error0;

        let threshold = F::cast(CONVERGENCE_FACTOR) * self.maximum_error;
        while error > threshold && used < max {
            // Bisect the sub-interval with the largest local error
            let mut worst = 0;
            for i in 1..used {
                if ei[i] > ei[worst] {
                    worst = i;
                }
            }
            let left = ai[worst];
            let right = bi[worst];
            let middle = (left + right) / F::cast(2.);
            let (v1, e1) = self.compute_rule(&f, left, middle)?;
            let (v2, e2) = self.compute_rule(&f, middle, right)?;
            bi[worst] = middle;
            fi[worst] = v1;
            ei[worst] = e1;
            ai[used] = middle;
            bi[used] = right;
            fi[used] = v2;
            ei[used] = e2;
            used += 1;

            value = fi.slice(s![..used]).sum();
            error = ei.slice(s![..used]).mapv(|e| e * e).sum().sqrt();
        }

        if error > threshold {
            log::warn!(
                "Gauss-Kronrod quadrature did not reach the requested error: \
                 achieved {error:?} with {used} sub-intervals, requested {:?}",
                self.maximum_error
            );
        }

        // Trim to the used length and sort by left bound so the partition
        // reads left to right
        let mut order: Vec<usize> = (0..used).collect();
        order.sort_by(|&i, &j| ai[i].partial_cmp(&ai[j]).unwrap());
        let lower_bounds = Array1::from_iter(order.iter().map(|&i| ai[i]));
        let upper_bounds = Array1::from_iter(order.iter().map(|&i| bi[i]));
        let contributions = Array1::from_iter(order.iter().map(|&i| fi[i]));
        let errors = Array1::from_iter(order.iter().map(|&i| ei[i]));

        Ok(QuadratureResult {
            value: if negate { -value } else { value },
            error,
            lower_bounds,
            upper_bounds,
            contributions,
            errors,
        })
    }

    /// Apply the embedded pair once on `[a, b]`, batching all evaluations of
    /// `f` into a single call. Returns the Kronrod estimate and the local
    /// error `|width * (kronrod - gauss)|`.
    fn compute_rule<Func>(&self, f: &Func, a: F, b: F) -> Result<(F, F)>
    where
        Func: Fn(&Array1<F>) -> Array1<F>,
    {
        let rule = &self.rule;
        let order = rule.order();
        let middle = (a + b) / F::cast(2.);
        let half_width = (b - a) / F::cast(2.);

        let mut points = Array1::<F>::zeros(2 * order + 1);
        points[0] = middle;
        for (j, &node) in rule.other_kronrod_nodes().iter().enumerate() {
            let offset = half_width * F::cast(node);
            points[1 + 2 * j] = middle - offset;
            points[2 + 2 * j] = middle + offset;
        }

        let values = f(&points);
        if values.len() != points.len() {
            return Err(UqError::InvalidArgument(format!(
                "integrand must map a batch of {} scalars to as many scalars, got {} values",
                points.len(),
                values.len()
            )));
        }

        let mut kronrod = F::cast(rule.zero_kronrod_weight()) * values[0];
        for (j, &w) in rule.other_kronrod_weights().iter().enumerate() {
            kronrod += F::cast(w) * (values[1 + 2 * j] + values[2 + 2 * j]);
        }
        // The Gauss nodes sit at the odd indices of the positive Kronrod
        // nodes
        let mut gauss = F::cast(rule.zero_gauss_weight()) * values[0];
        for (g, &w) in rule.other_gauss_weights().iter().enumerate() {
            let j = 2 * g + 1;
            gauss += F::cast(w) * (values[1 + 2 * j] + values[2 + 2 * j]);
        }

        let value = half_width * kronrod;
        let local_error = (half_width * (kronrod - gauss)).abs();
        Ok((value, local_error))
    }
}
