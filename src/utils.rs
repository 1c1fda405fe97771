use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix1, Ix2};
use std::fmt;

/// A map from the raw input space into the normalized space the kriging
/// model is fitted in.
///
/// The transformation is componentwise: input component `j` of the image
/// depends only on component `j` of the ante-image, so its jacobian is
/// diagonal and returned as the vector [`InputTransformation::scale`].
/// [`Standardization`] is the default implementation; callers may supply an
/// iso-probabilistic transformation of their input distribution instead.
pub trait InputTransformation<F: Float>: fmt::Debug + Send + Sync {
    /// Map raw input points (one per row) into the normalized space
    fn value(&self, x: &ArrayView2<F>) -> Array2<F>;

    /// Componentwise derivative of the transformation at a raw input point
    fn scale(&self, x: &ArrayView1<F>) -> Array1<F>;
}

/// Empirical componentwise standardization: subtract the sample mean,
/// divide by the sample standard deviation. A component whose deviation is
/// numerically zero is left unscaled.
#[derive(Debug, Clone)]
pub struct Standardization<F: Float> {
    mean: Array1<F>,
    std: Array1<F>,
}

impl<F: Float> Standardization<F> {
    /// Fit the standardization on a sample given as a (n, d) matrix.
    pub fn fit(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        let mean = x.mean_axis(Axis(0)).unwrap();
        let mut std = x.std_axis(Axis(0), F::one());
        std.mapv_inplace(|v| if v <= F::epsilon() { F::one() } else { v });
        Standardization { mean, std }
    }

    /// Sample mean per component
    pub fn mean(&self) -> &Array1<F> {
        &self.mean
    }

    /// Sample standard deviation per component (1 where degenerate)
    pub fn std(&self) -> &Array1<F> {
        &self.std
    }
}

impl<F: Float> InputTransformation<F> for Standardization<F> {
    fn value(&self, x: &ArrayView2<F>) -> Array2<F> {
        (x - &self.mean) / &self.std
    }

    fn scale(&self, _x: &ArrayView1<F>) -> Array1<F> {
        self.std.mapv(|v| F::one() / v)
    }
}

/// Pairwise componentwise absolute differences of a sample, i.e. the
/// strictly lower triangle of the distance structure a stationary
/// correlation model is discretized on.
#[derive(Debug, Clone)]
pub struct CrossDistances<F: Float> {
    /// Absolute differences as a (n * (n - 1) / 2, d) array
    pub d: Array2<F>,
    /// Row/column index pair of each difference in the original sample
    pub d_indices: Array2<usize>,
    /// Number of sample points
    pub n_obs: usize,
}

impl<F: Float> CrossDistances<F> {
    /// Compute the differences of a sample given as a (n, d) matrix.
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> CrossDistances<F> {
        let n_obs = x.nrows();
        let pairs = n_obs * (n_obs - 1) / 2;
        let mut d = Array2::zeros((pairs, x.ncols()));
        let mut d_indices = Array2::zeros((pairs, 2));
        let mut row = 0;
        for i in 0..n_obs {
            for j in (i + 1)..n_obs {
                let diff = (&x.row(i) - &x.row(j)).mapv(|v| v.abs());
                d.row_mut(row).assign(&diff);
                d_indices[[row, 0]] = i;
                d_indices[[row, 1]] = j;
                row += 1;
            }
        }
        CrossDistances { d, d_indices, n_obs }
    }
}

/// Computes differences between each row of `x` and each row of `y`,
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x)).
/// *Panics* if `x` and `y` do not have the same column count.
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());
    let ny = y.nrows();
    let mut result = Array2::zeros((x.nrows() * ny, x.ncols()));
    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            result.row_mut(i * ny + j).assign(&(&x_row - &y_row));
        }
    }
    result
}

/// Computes differences between the point `x` and each row of `y`,
/// resulting in a 2d array of shape (nrows(y), ncols(y)).
/// *Panics* if `x` and the rows of `y` do not have the same length.
pub fn differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.len() == y.ncols());
    x.to_owned() - y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_standardization() {
        let x = array![[1., 2.], [3., 4.]];
        let t = Standardization::fit(&x);
        assert_eq!(array![2., 3.], *t.mean());
        assert_eq!(array![f64::sqrt(2.), f64::sqrt(2.)], *t.std());
        let xnorm = t.value(&x.view());
        assert_abs_diff_eq!(xnorm.mean_axis(Axis(0)).unwrap(), array![0., 0.], epsilon = 1e-14);
        assert_abs_diff_eq!(
            t.scale(&x.row(0)),
            array![1. / f64::sqrt(2.), 1. / f64::sqrt(2.)],
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_standardization_degenerate_component() {
        // Second component is constant: it must be left unscaled
        let x = array![[0., 7.], [1., 7.], [2., 7.]];
        let t = Standardization::fit(&x);
        assert_eq!(t.std()[1], 1.);
        let xnorm = t.value(&x.view());
        assert_abs_diff_eq!(xnorm.column(1).to_owned(), array![0., 0., 0.]);
    }

    #[test]
    fn test_cross_distances() {
        let xt = array![[0.5], [1.2], [2.0], [3.0], [4.0]];
        let expected = array![
            [0.7],
            [1.5],
            [2.5],
            [3.5],
            [0.8],
            [1.8],
            [2.8],
            [1.],
            [2.],
            [1.]
        ];
        let expected_indices = array![
            [0, 1],
            [0, 2],
            [0, 3],
            [0, 4],
            [1, 2],
            [1, 3],
            [1, 4],
            [2, 3],
            [2, 4],
            [3, 4]
        ];
        let distances = CrossDistances::new(&xt);
        assert_abs_diff_eq!(expected, distances.d, epsilon = 1e-14);
        assert_eq!(expected_indices, distances.d_indices);
        assert_eq!(distances.n_obs, 5);
    }

    #[test]
    fn test_pairwise_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![
            [-1.26491106],
            [-0.63245553],
            [0.],
            [0.63245553],
            [1.26491106]
        ];
        assert_abs_diff_eq!(
            &array![
                [0.31622777],
                [-0.31622777],
                [-0.9486833],
                [-1.58113883],
                [-2.21359436],
                [0.44271887],
                [-0.18973666],
                [-0.82219219],
                [-1.45464772],
                [-2.08710326]
            ],
            &pairwise_differences(&x, &y),
            epsilon = 1e-6
        )
    }

    #[test]
    fn test_differences() {
        let x = array![-0.9486833];
        let y = array![[-1.26491106], [-0.63245553], [0.], [0.63245553], [1.26491106]];
        assert_abs_diff_eq!(
            &array![
                [0.31622777],
                [-0.31622777],
                [-0.9486833],
                [-1.58113883],
                [-2.21359436],
            ],
            &differences(&x, &y),
            epsilon = 1e-6
        )
    }
}
