use thiserror::Error;

/// A result type for uqbox algorithms
pub type Result<T> = std::result::Result<T, UqError>;

/// An error raised by the quadrature or kriging algorithms
#[derive(Error, Debug)]
pub enum UqError {
    /// When a precondition on an argument is violated: dimension or size
    /// mismatch, non-positive setting. Raised before any computation starts.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// When the Cholesky factorization of a correlation matrix cannot be
    /// regularized within the configured budget
    #[error(
        "Cholesky factorization failed: cumulated diagonal scaling {cumulated_scaling:e} \
         reached the maximal scaling {maximal_scaling:e}"
    )]
    NumericalFailure {
        /// Total ridge added to the diagonal over all attempts
        cumulated_scaling: f64,
        /// Configured regularization budget
        maximal_scaling: f64,
    },
    /// When the generalized least squares problem is too ill-conditioned
    #[error("Likelihood computation error: {0}")]
    LikelihoodComputation(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    Linalg(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    Linfa(#[from] linfa::error::Error),
}
