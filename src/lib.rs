//! This library implements the numerical core of an uncertainty
//! quantification toolbox: adaptive [Gauss-Kronrod](https://en.wikipedia.org/wiki/Gauss%E2%80%93Kronrod_quadrature_formula)
//! quadrature and [Kriging](https://en.wikipedia.org/wiki/Kriging)
//! (gaussian process) surrogate modeling.
//!
//! The quadrature engine integrates a batched scalar function to a target
//! absolute error by adaptive bisection over an embedded Gauss-Kronrod rule
//! pair; it is the numerical backbone for distribution functions without a
//! closed form. It is implemented by [`quadrature::GaussKronrod`] over the
//! rule tables of [`rules::GaussKronrodRule`].
//!
//! The kriging side fits a gaussian process metamodel: a polynomial trend
//! ([`trend::TrendModel`]) plus a stationary correlated term
//! ([`correlation_models::CorrelationModel`]), with ridge-regularized
//! Cholesky factorization of the correlation matrix
//! ([`RegularizedCholesky`]) and maximum likelihood estimation of the
//! correlation hyperparameters. Models are parameterized by
//! [`KrigingParams`] and fitted through the
//! [`linfa`](https://github.com/rust-ml/linfa) `Fit` trait into a
//! [`KrigingModel`].
mod algorithm;
mod cholesky;
pub mod correlation_models;
mod errors;
mod optimization;
mod parameters;
pub mod quadrature;
pub mod rules;
pub mod trend;
mod utils;

pub use algorithm::*;
pub use cholesky::*;
pub use errors::*;
pub use parameters::*;
pub use quadrature::*;
pub use utils::{differences, pairwise_differences, CrossDistances, InputTransformation, Standardization};
