//! A module for the trend basis, the deterministic mean part of the kriging
//! model. Low-degree polynomial bases are used in practice, the correlated
//! stochastic part capturing the rest.
//!
//! The following bases are implemented:
//! * constant,
//! * linear,
//! * quadratic

use linfa::Float;
use ndarray::{concatenate, s, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use paste::paste;
use std::fmt;

/// A trait for the trend basis of a kriging model: an ordered, fixed-size
/// collection of scalar regressor functions.
pub trait TrendModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Evaluate the `p` basis functions at the given `x` points specified as
    /// a (n, d) matrix, as a (n, p) design matrix.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;

    /// Gradient of the basis functions at the given point specified as a
    /// (d,) vector, as a (p, d) matrix.
    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F>;
}

/// A constant trend: a single basis function equal to 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConstantTrend();

impl<F: Float> TrendModel<F> for ConstantTrend {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::ones((x.nrows(), 1))
    }

    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F> {
        Array2::zeros((1, x.len()))
    }
}

/// An affine trend: `[1, x_1, ..., x_d]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinearTrend();

impl<F: Float> TrendModel<F> for LinearTrend {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.to_owned()]
    }

    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F> {
        let d = x.len();
        let mut jac = Array2::zeros((d + 1, d));
        jac.slice_mut(s![1.., ..]).assign(&Array2::eye(d));
        jac
    }
}

/// A degree-2 polynomial trend:
/// `[1, {x_i}, {x_i * x_j, i <= j}]` with the cross terms ordered by `i`
/// then `j`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QuadraticTrend();

impl<F: Float> TrendModel<F> for QuadraticTrend {
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let mut res = concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.to_owned()];
        for k in 0..x.ncols() {
            let part = x.slice(s![.., k..]).to_owned() * x.slice(s![.., k..k + 1]);
            res = concatenate![Axis(1), res, part]
        }
        res
    }

    fn jacobian(&self, x: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Array2<F> {
        let d = x.len();
        let mut jac = Array2::zeros((1 + d + d * (d + 1) / 2, d));
        jac.slice_mut(s![1..d + 1, ..]).assign(&Array2::eye(d));
        // d(x_i * x_j)/dx_l = x_j if l == i, plus x_i if l == j
        let mut row = 1 + d;
        for i in 0..d {
            for j in i..d {
                jac[[row, i]] = jac[[row, i]] + x[j];
                jac[[row, j]] = jac[[row, j]] + x[i];
                row += 1;
            }
        }
        jac
    }
}

macro_rules! declare_trend_display {
    ($trend:ident) => {
        paste! {
            impl fmt::Display for [<$trend Trend>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}Trend", stringify!($trend))
                }
            }
        }
    };
}

declare_trend_display!(Constant);
declare_trend_display!(Linear);
declare_trend_display!(Quadratic);
