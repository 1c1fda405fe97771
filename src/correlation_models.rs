//! A module for stationary correlation models, the positive-definite kernels
//! governing the covariance structure of the kriging model.
//!
//! The following kernels are implemented:
//! * squared exponential,
//! * absolute exponential,
//! * generalized exponential,
//! * spherical,
//! * exponentially damped cosine.
//!
//! The hyperparameter vector `theta` holds the inverse correlation lengths,
//! one per input component (a single value is broadcast by the caller). The
//! fitted `theta` is owned by the kriging model, not by the kernel value
//! object.

use crate::utils::{differences, CrossDistances};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use std::fmt;

/// A trait for using a stationary correlation kernel in kriging.
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute the correlation r(d) for each row of componentwise
    /// differences `d` (n, dim), given `theta` (dim,). The sign of `d` is
    /// irrelevant for the value.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F>;

    /// Compute the partial gradient of `r(x, x_i)` with respect to `x` at
    /// the given point, for every training point `x_i` (rows of `xtrain`),
    /// as a (n, dim) matrix.
    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F>;

    /// Discretize the kernel over a sample: build the symmetric correlation
    /// matrix from the strictly lower pairwise differences, with unit
    /// diagonal, mirroring the lower triangle.
    fn discretize(
        &self,
        distances: &CrossDistances<F>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let r = self.value(&distances.d, theta);
        let mut r_mx = Array2::eye(distances.n_obs);
        for (k, ij) in distances.d_indices.outer_iter().enumerate() {
            r_mx[[ij[0], ij[1]]] = r[k];
            r_mx[[ij[1], ij[0]]] = r[k];
        }
        r_mx
    }

    /// Whether the kernel depends on its arguments only through their
    /// difference. All carried kernels do.
    fn is_stationary(&self) -> bool {
        true
    }

    /// Size of the hyperparameter vector for a given input dimension.
    fn theta_dim(&self, input_dim: usize) -> usize {
        input_dim
    }
}

/// Squared exponential correlation kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    /// r(d) = exp( - sum_j (theta_j * d_j)^2 / 2 )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let theta_sqr = theta.mapv(|v| v * v);
        d.mapv(|v| v * v)
            .dot(&theta_sqr)
            .mapv(|v| (F::cast(-0.5) * v).exp())
    }

    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        let theta_sqr = theta.mapv(|v| v * v);
        // dr/dx_j = -theta_j^2 * d_j * r
        let jac = (&d * &theta_sqr) * &r.insert_axis(Axis(1));
        jac.mapv(|v| -v)
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Absolute exponential (Ornstein-Uhlenbeck) correlation kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    /// r(d) = exp( - sum_j theta_j * |d_j| )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        d.mapv(|v| v.abs()).dot(theta).mapv(|v| (-v).exp())
    }

    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        // dr/dx_j = -theta_j * sign(d_j) * r
        let jac = (d.mapv(|v| v.signum()) * theta) * &r.insert_axis(Axis(1));
        jac.mapv(|v| -v)
    }
}

impl fmt::Display for AbsoluteExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AbsoluteExponential")
    }
}

/// Generalized exponential correlation kernel with exponent `power` in
/// (0, 2]; `power = 1` is the absolute exponential, `power = 2` is gaussian
/// shaped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneralizedExponentialCorr {
    /// Common exponent applied to every scaled component distance
    pub power: f64,
}

impl Default for GeneralizedExponentialCorr {
    fn default() -> Self {
        GeneralizedExponentialCorr { power: 1.5 }
    }
}

impl<F: Float> CorrelationModel<F> for GeneralizedExponentialCorr {
    /// r(d) = exp( - sum_j (theta_j * |d_j|)^p )
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let p = F::cast(self.power);
        (d.mapv(|v| v.abs()) * theta)
            .mapv(|v| v.powf(p))
            .sum_axis(Axis(1))
            .mapv(|v| (-v).exp())
    }

    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let r = self.value(&d, theta);
        let p = F::cast(self.power);
        // dr/dx_j = -p * theta_j * (theta_j * |d_j|)^(p-1) * sign(d_j) * r
        let scaled = (d.mapv(|v| v.abs()) * theta).mapv(|v| v.powf(p - F::one()));
        let jac = (scaled * theta * d.mapv(|v| v.signum())).mapv(|v| p * v)
            * &r.insert_axis(Axis(1));
        jac.mapv(|v| -v)
    }
}

impl fmt::Display for GeneralizedExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GeneralizedExponential(p={})", self.power)
    }
}

/// Spherical correlation kernel with compact support: correlation vanishes
/// beyond a scaled distance of 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SphericalCorr();

impl SphericalCorr {
    fn scaled_norm<F: Float>(
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let theta_sqr = theta.mapv(|v| v * v);
        d.mapv(|v| v * v).dot(&theta_sqr).mapv(|v| v.sqrt())
    }
}

impl<F: Float> CorrelationModel<F> for SphericalCorr {
    /// r(d) = 1 - 1.5 h + 0.5 h^3 for h < 1 and 0 beyond,
    /// with h = || theta . d ||
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        Self::scaled_norm(d, theta).mapv(|h| {
            if h >= F::one() {
                F::zero()
            } else {
                F::one() - F::cast(1.5) * h + F::cast(0.5) * h * h * h
            }
        })
    }

    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let h = Self::scaled_norm(&d, theta);
        let theta_sqr = theta.mapv(|v| v * v);
        let mut jac = Array2::zeros((xtrain.nrows(), xtrain.ncols()));
        // dr/dx_j = 1.5 (h^2 - 1) * theta_j^2 * d_j / h inside the support;
        // the kernel is flat at h = 0 and outside the support
        for (i, hi) in h.iter().enumerate() {
            if *hi > F::zero() && *hi < F::one() {
                let slope = F::cast(1.5) * (*hi * *hi - F::one()) / *hi;
                let row = (&d.row(i) * &theta_sqr).mapv(|v| slope * v);
                jac.row_mut(i).assign(&row);
            }
        }
        jac
    }
}

impl fmt::Display for SphericalCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Spherical")
    }
}

/// Exponentially damped cosine correlation kernel: an absolute exponential
/// envelope modulating a cosine of the scaled distance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentiallyDampedCosineCorr {
    /// Frequency of the cosine modulation per unit of scaled distance
    pub frequency: f64,
}

impl Default for ExponentiallyDampedCosineCorr {
    fn default() -> Self {
        ExponentiallyDampedCosineCorr { frequency: 1.0 }
    }
}

impl<F: Float> CorrelationModel<F> for ExponentiallyDampedCosineCorr {
    /// r(d) = exp(-s) * cos(2 pi f s) with s = sum_j theta_j * |d_j|
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array1<F> {
        let pulsation = F::cast(2. * std::f64::consts::PI * self.frequency);
        d.mapv(|v| v.abs())
            .dot(theta)
            .mapv(|s| (-s).exp() * (pulsation * s).cos())
    }

    fn jacobian(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
        xtrain: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let d = differences(x, xtrain);
        let pulsation = F::cast(2. * std::f64::consts::PI * self.frequency);
        let s = d.mapv(|v| v.abs()).dot(theta);
        // dr/ds = -exp(-s) * (cos(2 pi f s) + 2 pi f sin(2 pi f s))
        let dr_ds = s.mapv(|s| -(-s).exp() * ((pulsation * s).cos() + pulsation * (pulsation * s).sin()));
        // ds/dx_j = theta_j * sign(d_j)
        (d.mapv(|v| v.signum()) * theta) * &dr_ds.insert_axis(Axis(1))
    }
}

impl fmt::Display for ExponentiallyDampedCosineCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ExponentiallyDampedCosine(f={})", self.frequency)
    }
}
