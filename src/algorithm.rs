//! Kriging model fitting and prediction.
//!
//! The metamodel is `Y(x) = basis(x) . beta + Z(x)` where `Z` is a centered
//! gaussian process with stationary correlation kernel. Fitting solves the
//! generalized least squares problem for `beta` through the Cholesky factor
//! of the correlation matrix and a thin QR factorization, and optionally
//! tunes the correlation hyperparameters by maximizing the concentrated
//! log-likelihood with a bound-constrained COBYLA search. Outputs with
//! several components are fitted independently, one model per component.

use crate::cholesky::RegularizedCholesky;
use crate::correlation_models::{CorrelationModel, SquaredExponentialCorr};
use crate::errors::{Result, UqError};
use crate::optimization::{optimize_theta, CobylaParams};
use crate::parameters::{KrigingParams, KrigingValidParams, ThetaTuning};
use crate::trend::{ConstantTrend, TrendModel};
use crate::utils::{pairwise_differences, CrossDistances, InputTransformation, Standardization};

use linfa::dataset::DatasetBase;
use linfa::traits::Fit;
use linfa::Float;
#[allow(unused_imports)]
use linfa_linalg::{cholesky::*, qr::*, svd::*, triangular::*};
use ndarray::{Array1, Array2, Array3, ArrayBase, ArrayView1, Axis, Data, Ix1, Ix2};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Minimum of likelihood evaluations granted to the COBYLA optimizer
pub const KRIGING_COBYLA_MIN_EVAL: usize = 25;
/// Default cap on likelihood evaluations per optimization
pub const KRIGING_COBYLA_MAX_EVAL: usize = 1000;

/// Per-output-component fitted state.
#[derive(Debug, Clone)]
pub(crate) struct ComponentModel<F: Float> {
    /// Correlation hyperparameters (inverse correlation lengths)
    theta: Array1<F>,
    /// Concentrated log-likelihood at `theta`
    likelihood: F,
    /// Process variance estimate (normalized output scale)
    sigma2: F,
    /// Generalized least-squares trend coefficients
    beta: Array1<F>,
    /// Correlation weights of the training residuals
    gamma: Array1<F>,
    /// Diagonal ridge the correlation matrix needed, 0 if none
    cumulated_scaling: F,
}

/// Training-set fit quality, one entry per output component.
#[derive(Debug, Clone)]
pub struct FitDiagnostics<F: Float> {
    /// Root mean square of metamodel minus truth on the training set
    pub residuals: Array1<F>,
    /// Squared residual divided by the empirical output variance
    pub relative_errors: Array1<F>,
}

/// Intermediate values produced alongside one likelihood evaluation.
struct LikelihoodTerms<F: Float> {
    sigma2: F,
    beta: Array2<F>,
    gamma: Array2<F>,
    cumulated_scaling: F,
}

/// Kriging as the canonical configuration: constant trend and squared
/// exponential correlation
pub type Kriging<F> = KrigingParams<F, ConstantTrend, SquaredExponentialCorr>;

impl<F: Float> Kriging<F> {
    /// Kriging parameters constructor
    pub fn params() -> Kriging<F> {
        KrigingParams::new(ConstantTrend(), SquaredExponentialCorr())
    }
}

/// A fitted kriging metamodel: trend coefficients plus correlation-weighted
/// residual term, per output component. Evaluation is read-only and
/// deterministic.
#[derive(Debug, Clone)]
pub struct KrigingModel<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> {
    /// Parameters used to fit this model
    params: KrigingValidParams<F, Trend, Corr>,
    /// Map from raw inputs to the normalized space the model lives in
    transformation: Arc<dyn InputTransformation<F>>,
    /// Training inputs in normalized space
    xt_norm: Array2<F>,
    /// Training output mean per component
    yt_mean: Array1<F>,
    /// Training output deviation per component
    yt_std: Array1<F>,
    /// Independently fitted output components
    components: Vec<ComponentModel<F>>,
    /// Training-set fit quality
    diagnostics: FitDiagnostics<F>,
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> KrigingModel<F, Trend, Corr> {
    /// Kriging parameters constructor given trend basis and correlation
    /// kernel
    pub fn params<NewTrend: TrendModel<F>, NewCorr: CorrelationModel<F>>(
        trend: NewTrend,
        corr: NewCorr,
    ) -> KrigingParams<F, NewTrend, NewCorr> {
        KrigingParams::new(trend, corr)
    }

    /// Predict output values at `n` points given as a (n, d) matrix.
    /// Returns a (n, ny) matrix, one column per output component. Rows are
    /// computed independently of each other.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array2<F>> {
        self.check_input_dim(x.ncols())?;
        let xnorm = self.transformation.value(&x.view());
        let f = self.params.trend().value(&xnorm);
        let dx = pairwise_differences(&xnorm, &self.xt_norm);
        let n = x.nrows();
        let nt = self.xt_norm.nrows();
        let mut y = Array2::zeros((n, self.components.len()));
        for (c, component) in self.components.iter().enumerate() {
            let corr = self
                .params
                .corr()
                .value(&dx, &component.theta)
                .into_shape((n, nt))
                .unwrap();
            let y_norm = f.dot(&component.beta) + corr.dot(&component.gamma);
            let yc = y_norm.mapv(|v| v * self.yt_std[c] + self.yt_mean[c]);
            y.column_mut(c).assign(&yc);
        }
        Ok(y)
    }

    /// Predict the gradient of every output component at one point given as
    /// a (d,) vector. Returns a (ny, d) matrix.
    pub fn predict_jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Array2<F>> {
        self.check_input_dim(x.len())?;
        Ok(self.jacobian_unchecked(&x.view()))
    }

    /// Predict gradients at `n` points given as a (n, d) matrix.
    /// Returns a (n, ny, d) array; points are evaluated in parallel.
    pub fn predict_gradients(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>> {
        self.check_input_dim(x.ncols())?;
        let xo = x.to_owned();
        let jacobians: Vec<Array2<F>> = (0..xo.nrows())
            .into_par_iter()
            .map(|i| self.jacobian_unchecked(&xo.row(i)))
            .collect();
        let mut out = Array3::zeros((xo.nrows(), self.components.len(), xo.ncols()));
        for (i, jac) in jacobians.iter().enumerate() {
            out.index_axis_mut(Axis(0), i).assign(jac);
        }
        Ok(out)
    }

    fn jacobian_unchecked(&self, x: &ArrayView1<F>) -> Array2<F> {
        let xx = x.to_owned().insert_axis(Axis(0));
        let xnorm = self.transformation.value(&xx.view());
        let xnorm_row = xnorm.row(0);
        let scale = self.transformation.scale(x);
        let df = self.params.trend().jacobian(&xnorm_row);
        let mut jac = Array2::zeros((self.components.len(), x.len()));
        for (c, component) in self.components.iter().enumerate() {
            let dr = self
                .params
                .corr()
                .jacobian(&xnorm_row, &self.xt_norm, &component.theta);
            // d y / d xnorm, then chain through output scaling and the
            // input transformation
            let grad_norm = df.t().dot(&component.beta) + dr.t().dot(&component.gamma);
            let grad = (grad_norm * &scale).mapv(|v| v * self.yt_std[c]);
            jac.row_mut(c).assign(&grad);
        }
        jac
    }

    fn check_input_dim(&self, given: usize) -> Result<()> {
        let expected = self.xt_norm.ncols();
        if given != expected {
            return Err(UqError::InvalidArgument(format!(
                "query points have dimension {given}, training inputs have dimension {expected}"
            )));
        }
        Ok(())
    }

    /// Input and output dimensions (d, ny)
    pub fn dims(&self) -> (usize, usize) {
        (self.xt_norm.ncols(), self.components.len())
    }

    /// Number of training points
    pub fn n_train(&self) -> usize {
        self.xt_norm.nrows()
    }

    /// Fitted correlation hyperparameters of an output component
    pub fn theta(&self, output: usize) -> &Array1<F> {
        &self.components[output].theta
    }

    /// Concentrated log-likelihood reached by an output component
    pub fn likelihood(&self, output: usize) -> F {
        self.components[output].likelihood
    }

    /// Process variance estimate of an output component
    pub fn variance(&self, output: usize) -> F {
        self.components[output].sigma2
    }

    /// Trend coefficients of an output component
    pub fn beta(&self, output: usize) -> &Array1<F> {
        &self.components[output].beta
    }

    /// Correlation weights of an output component
    pub fn gamma(&self, output: usize) -> &Array1<F> {
        &self.components[output].gamma
    }

    /// Diagonal ridge the correlation matrix of an output component needed
    pub fn cumulated_scaling(&self, output: usize) -> F {
        self.components[output].cumulated_scaling
    }

    /// Training-set fit quality
    pub fn diagnostics(&self) -> &FitDiagnostics<F> {
        &self.diagnostics
    }
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> fmt::Display
    for KrigingModel<F, Trend, Corr>
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Kriging(trend={}, corr={}",
            self.params.trend(),
            self.params.corr()
        )?;
        for (c, component) in self.components.iter().enumerate() {
            write!(
                f,
                ", [{}] theta={} likelihood={}",
                c, component.theta, component.likelihood
            )?;
        }
        write!(f, ")")
    }
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>, D: Data<Elem = F>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>, UqError> for KrigingValidParams<F, Trend, Corr>
{
    type Object = KrigingModel<F, Trend, Corr>;

    /// Fit the kriging metamodel on a dataset of (n, d) inputs and (n, ny)
    /// outputs, each output component independently.
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix2>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        let n = x.nrows();
        let dim = x.ncols();
        if n == 0 || dim == 0 {
            return Err(UqError::InvalidArgument(
                "input sample cannot be empty".to_string(),
            ));
        }
        if y.nrows() != n {
            return Err(UqError::InvalidArgument(format!(
                "input and output samples must have the same size, got {} and {}",
                n,
                y.nrows()
            )));
        }
        if y.ncols() == 0 {
            return Err(UqError::InvalidArgument(
                "output sample cannot be empty".to_string(),
            ));
        }
        if n < 2 {
            return Err(UqError::InvalidArgument(format!(
                "at least 2 training points are needed, got {n}"
            )));
        }
        let theta_dim = self.corr().theta_dim(dim);
        let theta0 = expand_theta(self.theta_tuning().init(), theta_dim)?;
        let bounds = match self.theta_tuning() {
            ThetaTuning::Fixed(_) => None,
            ThetaTuning::Optimized { init: _, bounds } => Some(expand_bounds(bounds, theta_dim)?),
        };

        let transformation: Arc<dyn InputTransformation<F>> = match self.input_transformation() {
            Some(t) => t.clone(),
            None => Arc::new(Standardization::fit(x)),
        };
        let xt_norm = transformation.value(&x.view());
        let y_standardization = Standardization::fit(y);
        let yt_norm = y_standardization.value(&y.view());

        let fx = self.trend().value(&xt_norm);
        if n <= fx.ncols() {
            return Err(UqError::InvalidArgument(format!(
                "at least {} training points are needed for a trend basis of size {}, got {}",
                fx.ncols() + 1,
                fx.ncols(),
                n
            )));
        }

        let x_distances = CrossDistances::new(&xt_norm);
        let closeness = x_distances.d.sum_axis(Axis(1));
        if n > 1 && *closeness.min().unwrap() == F::zero() {
            log::warn!("multiple input points share the same value (at least one duplicated row)");
        }

        let components = (0..y.ncols())
            .into_par_iter()
            .map(|c| {
                let yc = yt_norm.column(c).to_owned().insert_axis(Axis(1));
                fit_component(self, &theta0, bounds.as_deref(), &fx, &x_distances, &yc)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut model = KrigingModel {
            params: self.clone(),
            transformation,
            xt_norm,
            yt_mean: y_standardization.mean().to_owned(),
            yt_std: y_standardization.std().to_owned(),
            components,
            diagnostics: FitDiagnostics {
                residuals: Array1::zeros(y.ncols()),
                relative_errors: Array1::zeros(y.ncols()),
            },
        };

        let y_hat = model.predict(x)?;
        let n_obs = F::cast(n);
        let mut residuals = Array1::zeros(y.ncols());
        let mut relative_errors = Array1::zeros(y.ncols());
        let y_var = y.var_axis(Axis(0), F::one());
        for c in 0..y.ncols() {
            let squared = (&y_hat.column(c) - &y.column(c))
                .mapv(|v| v * v)
                .sum()
                / n_obs;
            residuals[c] = squared.sqrt();
            relative_errors[c] = if y_var[c] > F::zero() {
                squared / y_var[c]
            } else {
                F::zero()
            };
        }
        model.diagnostics = FitDiagnostics {
            residuals,
            relative_errors,
        };
        Ok(model)
    }
}

/// Broadcast a length-1 hyperparameter vector to the kernel dimension, or
/// reject a mismatched length.
fn expand_theta<F: Float>(theta: &Array1<F>, dim: usize) -> Result<Array1<F>> {
    if theta.len() == dim {
        Ok(theta.to_owned())
    } else if theta.len() == 1 {
        Ok(Array1::from_elem(dim, theta[0]))
    } else {
        Err(UqError::InvalidArgument(format!(
            "hyperparameter vector has size {}, kernel expects 1 or {}",
            theta.len(),
            dim
        )))
    }
}

fn expand_bounds<F: Float>(bounds: &Array1<(F, F)>, dim: usize) -> Result<Vec<(F, F)>> {
    if bounds.len() == dim {
        Ok(bounds.to_vec())
    } else if bounds.len() == 1 {
        Ok(vec![bounds[0]; dim])
    } else {
        Err(UqError::InvalidArgument(format!(
            "hyperparameter bounds have size {}, kernel expects 1 or {}",
            bounds.len(),
            dim
        )))
    }
}

/// Fit one output component: tune the hyperparameters when bounds are given,
/// then populate the component state at the retained point.
fn fit_component<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>>(
    params: &KrigingValidParams<F, Trend, Corr>,
    theta0: &Array1<F>,
    bounds: Option<&[(F, F)]>,
    fx: &Array2<F>,
    x_distances: &CrossDistances<F>,
    yc: &Array2<F>,
) -> Result<ComponentModel<F>> {
    let theta = match bounds {
        None => theta0.to_owned(),
        Some(bounds) => {
            // The optimizer works on log10(theta) within log10 bounds
            let initial_likelihood =
                concentrated_log_likelihood(theta0, params, fx, x_distances, yc)
                    .map(|(lkh, _)| lkh)
                    .unwrap_or_else(|_| F::neg_infinity());
            let objfn = |xlog: &[f64]| -> f64 {
                let mut theta = Array1::<F>::zeros(xlog.len());
                for (t, v) in theta.iter_mut().zip(xlog) {
                    if v.is_nan() {
                        return f64::INFINITY;
                    }
                    *t = F::cast(10f64.powf(*v));
                }
                match concentrated_log_likelihood(&theta, params, fx, x_distances, yc) {
                    Ok((lkh, _)) => num_traits::cast::<F, f64>(-lkh).unwrap_or(f64::INFINITY),
                    Err(_) => f64::INFINITY,
                }
            };
            let theta0_log = theta0.mapv(|v| num_traits::cast::<F, f64>(v.log10()).unwrap());
            let bounds_log = bounds
                .iter()
                .map(|(lo, up)| {
                    (
                        num_traits::cast::<F, f64>(lo.log10()).unwrap(),
                        num_traits::cast::<F, f64>(up.log10()).unwrap(),
                    )
                })
                .collect::<Vec<_>>();
            let maxeval = (10 * theta0.len()).clamp(KRIGING_COBYLA_MIN_EVAL, params.max_eval());
            let (fmin, xopt) = optimize_theta(
                objfn,
                &theta0_log,
                &bounds_log,
                CobylaParams {
                    maxeval,
                    ..CobylaParams::default()
                },
            );
            let optimized_likelihood = F::cast(-fmin);
            // Keep the initial point unless the optimizer strictly improved
            // on it; ties go to the initial hyperparameters
            if fmin.is_finite() && optimized_likelihood > initial_likelihood {
                xopt.mapv(|v| F::cast(10f64.powf(v)))
            } else {
                theta0.to_owned()
            }
        }
    };
    // One final evaluation at the retained point so beta/gamma reflect it
    // exactly
    let (likelihood, terms) = concentrated_log_likelihood(&theta, params, fx, x_distances, yc)?;
    Ok(ComponentModel {
        theta,
        likelihood,
        sigma2: terms.sigma2,
        beta: terms.beta.column(0).to_owned(),
        gamma: terms.gamma.column(0).to_owned(),
        cumulated_scaling: terms.cumulated_scaling,
    })
}

/// Evaluate the concentrated log-likelihood of one output component at the
/// given hyperparameters, producing `beta`/`gamma` as a byproduct.
///
/// The correlation matrix is discretized on the training sample, factorized
/// with ridge regularization, and the generalized least squares problem is
/// solved through triangular solves and a thin QR factorization. Higher is
/// better: the returned value is `-(ln(sigma2) + log det R / n)`.
fn concentrated_log_likelihood<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>>(
    theta: &Array1<F>,
    params: &KrigingValidParams<F, Trend, Corr>,
    fx: &Array2<F>,
    x_distances: &CrossDistances<F>,
    yc: &Array2<F>,
) -> Result<(F, LikelihoodTerms<F>)> {
    let r_mx = params.corr().discretize(x_distances, theta);
    let factor = params.regularization().factorize(&r_mx)?;
    let r_chol = &factor.lower;

    // Solve the generalized least squares problem
    let ft = r_chol.solve_triangular(fx, UPLO::Lower)?;
    let (ft_qr_q, ft_qr_r) = ft.qr()?.into_decomp();

    // Check whether we have an ill-conditioned problem
    let (_, sv_qr_r, _) = ft_qr_r.svd(false, false)?;
    let cond_ft = sv_qr_r[sv_qr_r.len() - 1] / sv_qr_r[0];
    if cond_ft < F::cast(1e-10) {
        let (_, sv_f, _) = fx.svd(false, false)?;
        let cond_fx = sv_f[0] / sv_f[sv_f.len() - 1];
        if cond_fx > F::cast(1e15) {
            return Err(UqError::LikelihoodComputation(
                "trend design matrix is too ill conditioned: poor combination \
                 of basis and observations"
                    .to_string(),
            ));
        } else {
            // Only the whitened design is degenerate: another theta may work
            return Err(UqError::LikelihoodComputation(
                "whitened design matrix is too ill conditioned at these hyperparameters"
                    .to_string(),
            ));
        }
    }

    let yt = r_chol.solve_triangular(yc, UPLO::Lower)?;
    let beta = ft_qr_r.solve_triangular_into(ft_qr_q.t().dot(&yt), UPLO::Upper)?;
    let rho = yt - ft.dot(&beta);
    let rho_sqr = rho.mapv(|v| v * v).sum();
    let gamma = r_chol.t().solve_triangular_into(rho, UPLO::Upper)?;

    let n_obs = F::cast(x_distances.n_obs);
    let sigma2 = rho_sqr / n_obs;
    // The determinant of R is the squared product of the diagonal of its
    // Cholesky factor
    let log_det = r_chol.diag().mapv(|v| v.ln()).sum() * F::cast(2.) / n_obs;
    let safe_sigma2 = if sigma2 > F::zero() {
        sigma2
    } else {
        F::cast(f64::MIN_POSITIVE)
    };
    let likelihood = -(safe_sigma2.ln() + log_det);
    Ok((
        likelihood,
        LikelihoodTerms {
            sigma2,
            beta,
            gamma,
            cumulated_scaling: factor.cumulated_scaling,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation_models::*;
    use crate::trend::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use linfa::ParamGuard;
    use ndarray::{array, Array};
    use paste::paste;

    fn xsinx_data() -> (Array2<f64>, Array2<f64>) {
        let xt = array![[0.], [1.], [2.], [3.], [4.], [5.]];
        let yt = xt.mapv(f64::sin);
        (xt, yt)
    }

    #[test]
    fn test_interpolation_at_training_points() {
        // With distinct points and no noise the kriging mean interpolates
        let (xt, yt) = xsinx_data();
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("kriging fit");
        assert_eq!(model.cumulated_scaling(0), 0.);
        let y_hat = model.predict(&xt).expect("prediction");
        assert_abs_diff_eq!(y_hat, yt, epsilon = 1e-6);
        assert!(model.diagnostics().residuals[0] < 1e-6);
    }

    #[test]
    fn test_end_to_end_sine() {
        let (xt, yt) = xsinx_data();
        let model = Kriging::params()
            .theta_init(array![1.0])
            .fit(&Dataset::new(xt, yt))
            .expect("kriging fit");
        assert!(model.diagnostics().residuals[0] < 0.05);
        let y_hat = model.predict(&array![[2.5]]).expect("prediction");
        assert_abs_diff_eq!(y_hat[[0, 0]], 2.5f64.sin(), epsilon = 0.15);
    }

    #[test]
    fn test_optimization_never_decreases_likelihood() {
        let (xt, yt) = xsinx_data();
        let fixed = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![0.1]))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("kriging fit");
        let tuned = Kriging::params()
            .theta_init(array![0.1])
            .fit(&Dataset::new(xt, yt))
            .expect("kriging fit");
        assert!(tuned.likelihood(0) >= fixed.likelihood(0) - 1e-10);
    }

    #[test]
    fn test_trend_only_fit_under_independence() {
        // A huge inverse correlation length decorrelates the training
        // points, so predictions away from them reduce to the linear
        // least squares trend
        let xt = array![[0.], [1.], [2.], [3.], [4.], [5.]];
        let yt = xt.mapv(|v| 2. + 3. * v);
        let model = KrigingModel::<f64, LinearTrend, SquaredExponentialCorr>::params(
            LinearTrend(),
            SquaredExponentialCorr(),
        )
        .theta_tuning(ThetaTuning::Fixed(array![50.]))
        .fit(&Dataset::new(xt, yt))
        .expect("kriging fit");
        let xq = array![[0.5], [2.5], [4.5]];
        let y_hat = model.predict(&xq).expect("prediction");
        let expected = xq.mapv(|v| 2. + 3. * v);
        assert_abs_diff_eq!(y_hat, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_multi_output_components_are_independent() {
        let xt = array![[0.], [1.], [2.], [3.], [4.], [5.]];
        let y0 = xt.mapv(f64::sin);
        let y1 = xt.mapv(f64::cos);
        let yt = ndarray::concatenate![Axis(1), y0.clone(), y1.clone()];

        let both = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("kriging fit");
        let first = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt.clone(), y0))
            .expect("kriging fit");

        assert_eq!(both.dims(), (1, 2));
        let xq = array![[0.3], [2.2], [4.8]];
        let y_both = both.predict(&xq).expect("prediction");
        let y_first = first.predict(&xq).expect("prediction");
        assert_abs_diff_eq!(
            y_both.column(0).to_owned(),
            y_first.column(0).to_owned(),
            epsilon = 1e-12
        );
        let y_hat = both.predict(&xt).expect("prediction");
        assert_abs_diff_eq!(y_hat, yt, epsilon = 1e-6);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        use finitediff::FiniteDiff;
        let (xt, yt) = xsinx_data();
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt, yt))
            .expect("kriging fit");
        for &xq in [0.4, 1.7, 3.3].iter() {
            let jac = model.predict_jacobian(&array![xq]).expect("gradient");
            let fd = array![xq].central_diff(&|v: &Array1<f64>| {
                model
                    .predict(&v.to_owned().insert_axis(Axis(0)))
                    .unwrap()[[0, 0]]
            });
            assert_abs_diff_eq!(jac[[0, 0]], fd[0], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_batch_gradients_match_pointwise() {
        let (xt, yt) = xsinx_data();
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt, yt))
            .expect("kriging fit");
        let xq = array![[0.4], [1.7], [3.3]];
        let grads = model.predict_gradients(&xq).expect("gradients");
        assert_eq!(grads.dim(), (3, 1, 1));
        for (i, row) in xq.rows().into_iter().enumerate() {
            let jac = model.predict_jacobian(&row).expect("gradient");
            assert_abs_diff_eq!(grads[[i, 0, 0]], jac[[0, 0]], epsilon = 1e-13);
        }
    }

    #[test]
    fn test_validation_errors() {
        let xt = array![[0.], [1.], [2.]];
        let yt_short = array![[0.], [1.]];
        let result = Kriging::params()
            .check()
            .unwrap()
            .fit(&Dataset::new(xt.clone(), yt_short));
        assert!(matches!(result, Err(UqError::InvalidArgument(_))));

        // Hyperparameter vector size must be 1 or the input dimension
        let yt = array![[0.], [1.], [2.]];
        let result = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0, 2.0]))
            .check()
            .unwrap()
            .fit(&Dataset::new(xt.clone(), yt.clone()));
        assert!(matches!(result, Err(UqError::InvalidArgument(_))));

        // Query dimension mismatch after fit
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt, yt))
            .expect("kriging fit");
        assert!(model.predict(&array![[0.5, 0.5]]).is_err());
        assert!(model.predict_jacobian(&array![0.5, 0.5]).is_err());
    }

    #[test]
    fn test_duplicated_points_still_fit() {
        // An exactly duplicated input row makes the correlation matrix
        // singular to machine precision: fitting must still succeed, ridge
        // regularized if needed, and keep interpolating the sample
        let xt = array![[0.], [1.], [1.], [3.], [4.]];
        let yt = array![[0.], [1.], [1.], [2.], [1.5]];
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("kriging fit");
        assert!(model.cumulated_scaling(0) >= 0.);
        let y_hat = model.predict(&xt).expect("prediction");
        assert_abs_diff_eq!(y_hat, yt, epsilon = 1e-3);
    }

    #[test]
    fn test_user_supplied_input_transformation() {
        // The iso-probabilistic transformation of a uniform distribution on
        // [0, 5] maps onto [-sqrt(3), sqrt(3)]; supplying it replaces the
        // empirical standardization
        #[derive(Debug)]
        struct UniformTransformation;
        impl InputTransformation<f64> for UniformTransformation {
            fn value(&self, x: &ndarray::ArrayView2<f64>) -> Array2<f64> {
                x.mapv(|v| (v / 5. - 0.5) * 2. * 3f64.sqrt())
            }
            fn scale(&self, x: &ArrayView1<f64>) -> Array1<f64> {
                Array1::from_elem(x.len(), 2. * 3f64.sqrt() / 5.)
            }
        }

        let (xt, yt) = xsinx_data();
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .input_transformation(Arc::new(UniformTransformation))
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .expect("kriging fit");
        let y_hat = model.predict(&xt).expect("prediction");
        assert_abs_diff_eq!(y_hat, yt, epsilon = 1e-6);

        use finitediff::FiniteDiff;
        let jac = model.predict_jacobian(&array![2.2]).expect("gradient");
        let fd = array![2.2].central_diff(&|v: &Array1<f64>| {
            model
                .predict(&v.to_owned().insert_axis(Axis(0)))
                .unwrap()[[0, 0]]
        });
        assert_abs_diff_eq!(jac[[0, 0]], fd[0], epsilon = 1e-5);
    }

    #[test]
    fn test_display() {
        let (xt, yt) = xsinx_data();
        let model = Kriging::params()
            .theta_tuning(ThetaTuning::Fixed(array![1.0]))
            .fit(&Dataset::new(xt, yt))
            .expect("kriging fit");
        let display = format!("{model}");
        assert!(display.contains("ConstantTrend"));
        assert!(display.contains("SquaredExponential"));
    }

    macro_rules! test_kriging {
        ($trend:ident, $corr:ident) => {
            paste! {
                #[test]
                fn [<test_kriging_ $trend:snake _ $corr:snake>]() {
                    let xt = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
                    let yt = array![[0.0], [1.0], [1.5], [0.9], [1.0]];
                    let model = KrigingModel::<f64, [<$trend Trend>], [<$corr Corr>]>::params(
                        [<$trend Trend>]::default(),
                        [<$corr Corr>]::default(),
                    )
                    .theta_tuning(ThetaTuning::Fixed(array![1.0]))
                    .fit(&Dataset::new(xt.clone(), yt.clone()))
                    .expect("kriging fit");
                    // Exact interpolation at the training points
                    let y_hat = model.predict(&xt).expect("prediction");
                    assert_abs_diff_eq!(y_hat, yt, epsilon = 1e-5);
                    // Plausible values in between
                    let xplot = Array::linspace(0., 4., 50).insert_axis(Axis(1));
                    let y_plot = model.predict(&xplot).expect("prediction");
                    assert!(y_plot.iter().all(|v| v.abs() < 10.));
                }
            }
        };
    }

    test_kriging!(Constant, SquaredExponential);
    test_kriging!(Constant, AbsoluteExponential);
    test_kriging!(Constant, GeneralizedExponential);
    test_kriging!(Constant, ExponentiallyDampedCosine);
    test_kriging!(Linear, SquaredExponential);
    test_kriging!(Linear, AbsoluteExponential);
    test_kriging!(Quadratic, SquaredExponential);
}
