use crate::cholesky::RegularizedCholesky;
use crate::correlation_models::CorrelationModel;
use crate::errors::{Result, UqError};
use crate::trend::TrendModel;
use crate::utils::InputTransformation;
use crate::{KRIGING_COBYLA_MAX_EVAL, KRIGING_COBYLA_MIN_EVAL};
use linfa::{Float, ParamGuard};
use ndarray::{array, Array1};
use std::sync::Arc;

/// How the correlation hyperparameters are handled during fitting.
#[derive(Clone, Debug, PartialEq)]
pub enum ThetaTuning<F: Float> {
    /// Hyperparameters used as given, no tuning: only the trend coefficients
    /// and correlation weights are fitted
    Fixed(Array1<F>),
    /// Hyperparameters tuned by maximizing the concentrated log-likelihood
    /// between the given bounds, starting from the initial guess
    Optimized {
        /// Initial guess for the hyperparameters
        init: Array1<F>,
        /// Box (lower, upper) per hyperparameter
        bounds: Array1<(F, F)>,
    },
}

impl<F: Float> Default for ThetaTuning<F> {
    fn default() -> Self {
        ThetaTuning::Optimized {
            init: array![F::cast(ThetaTuning::<F>::DEFAULT_INIT)],
            bounds: array![(
                F::cast(ThetaTuning::<F>::DEFAULT_BOUNDS.0),
                F::cast(ThetaTuning::<F>::DEFAULT_BOUNDS.1),
            )],
        }
    }
}

impl<F: Float> ThetaTuning<F> {
    /// Default initial hyperparameter value
    pub const DEFAULT_INIT: f64 = 1e-1;
    /// Default hyperparameter bounds
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-2, 1e1);

    /// Get the initial (or fixed) hyperparameter values
    pub fn init(&self) -> &Array1<F> {
        match self {
            ThetaTuning::Fixed(init) => init,
            ThetaTuning::Optimized { init, bounds: _ } => init,
        }
    }

    /// Get the optimization bounds, if any
    pub fn bounds(&self) -> Option<&Array1<(F, F)>> {
        match self {
            ThetaTuning::Fixed(_) => None,
            ThetaTuning::Optimized { init: _, bounds } => Some(bounds),
        }
    }
}

/// A set of validated kriging parameters.
#[derive(Clone, Debug)]
pub struct KrigingValidParams<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> {
    pub(crate) trend: Trend,
    pub(crate) corr: Corr,
    pub(crate) theta_tuning: ThetaTuning<F>,
    pub(crate) regularization: RegularizedCholesky<F>,
    pub(crate) max_eval: usize,
    pub(crate) input_transformation: Option<Arc<dyn InputTransformation<F>>>,
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> Default
    for KrigingValidParams<F, Trend, Corr>
{
    fn default() -> Self {
        KrigingValidParams {
            trend: Trend::default(),
            corr: Corr::default(),
            theta_tuning: ThetaTuning::default(),
            regularization: RegularizedCholesky::default(),
            max_eval: KRIGING_COBYLA_MAX_EVAL,
            input_transformation: None,
        }
    }
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> KrigingValidParams<F, Trend, Corr> {
    /// Get the trend basis
    pub fn trend(&self) -> &Trend {
        &self.trend
    }

    /// Get the correlation kernel
    pub fn corr(&self) -> &Corr {
        &self.corr
    }

    /// Get the hyperparameter tuning mode
    pub fn theta_tuning(&self) -> &ThetaTuning<F> {
        &self.theta_tuning
    }

    /// Get the Cholesky regularization policy
    pub fn regularization(&self) -> &RegularizedCholesky<F> {
        &self.regularization
    }

    /// Get the cap on likelihood evaluations per optimization
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }

    /// Get the input transformation, if one was supplied
    pub fn input_transformation(&self) -> Option<&Arc<dyn InputTransformation<F>>> {
        self.input_transformation.as_ref()
    }
}

/// The set of parameters configuring a kriging fit.
#[derive(Clone, Debug)]
pub struct KrigingParams<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>>(
    pub(crate) KrigingValidParams<F, Trend, Corr>,
);

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> KrigingParams<F, Trend, Corr> {
    /// A constructor given the trend basis and the correlation kernel
    pub fn new(trend: Trend, corr: Corr) -> KrigingParams<F, Trend, Corr> {
        Self(KrigingValidParams {
            trend,
            corr,
            ..Default::default()
        })
    }

    /// Set the trend basis.
    pub fn trend(mut self, trend: Trend) -> Self {
        self.0.trend = trend;
        self
    }

    /// Set the correlation kernel.
    pub fn corr(mut self, corr: Corr) -> Self {
        self.0.corr = corr;
        self
    }

    /// Set the hyperparameter tuning mode.
    pub fn theta_tuning(mut self, theta_tuning: ThetaTuning<F>) -> Self {
        self.0.theta_tuning = theta_tuning;
        self
    }

    /// Set the initial hyperparameter guess, keeping the tuning mode.
    pub fn theta_init(mut self, theta_init: Array1<F>) -> Self {
        self.0.theta_tuning = match self.0.theta_tuning {
            ThetaTuning::Fixed(_) => ThetaTuning::Fixed(theta_init),
            ThetaTuning::Optimized { init: _, bounds } => ThetaTuning::Optimized {
                init: theta_init,
                bounds,
            },
        };
        self
    }

    /// Set the hyperparameter search box. No-op when tuning is fixed.
    pub fn theta_bounds(mut self, theta_bounds: Array1<(F, F)>) -> Self {
        self.0.theta_tuning = match self.0.theta_tuning {
            ThetaTuning::Fixed(f) => ThetaTuning::Fixed(f),
            ThetaTuning::Optimized { init, bounds: _ } => ThetaTuning::Optimized {
                init,
                bounds: theta_bounds,
            },
        };
        self
    }

    /// Set the Cholesky regularization policy.
    pub fn regularization(mut self, regularization: RegularizedCholesky<F>) -> Self {
        self.0.regularization = regularization;
        self
    }

    /// Set the cap on likelihood evaluations per optimization, floored at
    /// [`crate::KRIGING_COBYLA_MIN_EVAL`].
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = KRIGING_COBYLA_MIN_EVAL.max(max_eval);
        self
    }

    /// Set a caller-supplied input transformation (e.g. the iso-probabilistic
    /// transformation of the input distribution) to be used instead of the
    /// empirical standardization fitted on the training inputs.
    pub fn input_transformation(
        mut self,
        transformation: Arc<dyn InputTransformation<F>>,
    ) -> Self {
        self.0.input_transformation = Some(transformation);
        self
    }
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>>
    From<KrigingValidParams<F, Trend, Corr>> for KrigingParams<F, Trend, Corr>
{
    fn from(valid: KrigingValidParams<F, Trend, Corr>) -> Self {
        KrigingParams(valid)
    }
}

impl<F: Float, Trend: TrendModel<F>, Corr: CorrelationModel<F>> ParamGuard
    for KrigingParams<F, Trend, Corr>
{
    type Checked = KrigingValidParams<F, Trend, Corr>;
    type Error = UqError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let init = self.0.theta_tuning.init();
        if init.is_empty() {
            return Err(UqError::InvalidArgument(
                "initial theta cannot be empty".to_string(),
            ));
        }
        for v in init.iter() {
            if !(*v > F::zero()) {
                return Err(UqError::InvalidArgument(format!(
                    "initial theta values must be positive, got {v:?}"
                )));
            }
        }
        if let Some(bounds) = self.0.theta_tuning.bounds() {
            if bounds.is_empty() {
                return Err(UqError::InvalidArgument(
                    "theta bounds cannot be empty".to_string(),
                ));
            }
            for (lo, up) in bounds.iter() {
                if !(*lo > F::zero()) || !(*up > *lo) {
                    return Err(UqError::InvalidArgument(format!(
                        "theta bounds must satisfy 0 < lower < upper, got ({lo:?}, {up:?})"
                    )));
                }
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
