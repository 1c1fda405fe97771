use cobyla::{minimize, Func, RhoBeg, StopTols};
use ndarray::{arr1, Array1};

/// Settings of the bound-constrained COBYLA optimizer used for likelihood
/// maximization.
pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

/// Minimize `objfn` over the box `bounds` starting from `param0`.
///
/// The caller works in log10(theta) space: both `param0` and `bounds` are
/// log10 values. Returns the best objective value and the best point found.
/// An optimizer failure is recoverable: it is logged and reported as an
/// infinite objective so the caller falls back to its starting point.
pub(crate) fn optimize_theta<ObjF>(
    objfn: ObjF,
    param0: &Array1<f64>,
    bounds: &[(f64, f64)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64]) -> f64,
{
    let cons: Vec<&dyn Func<()>> = vec![];
    let param0 = param0.to_vec();

    match minimize(
        |x, _u| objfn(x),
        &param0,
        bounds,
        &cons,
        (),
        cobyla.maxeval,
        RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let fval = if f64::is_nan(fval) { f64::INFINITY } else { fval };
            (fval, arr1(&x_opt))
        }
        Err((status, x_opt, _)) => {
            log::warn!("COBYLA optimizer failed in likelihood maximization: status={status:?}");
            (f64::INFINITY, arr1(&x_opt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_optimize_quadratic_bowl() {
        let objfn = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[1] + 0.2).powi(2);
        let (fval, xopt) = optimize_theta(
            objfn,
            &arr1(&[0., 0.]),
            &[(-1., 1.), (-1., 1.)],
            CobylaParams {
                maxeval: 200,
                ..CobylaParams::default()
            },
        );
        assert!(fval < 1e-4);
        assert_abs_diff_eq!(xopt[0], 0.3, epsilon = 1e-2);
        assert_abs_diff_eq!(xopt[1], -0.2, epsilon = 1e-2);
    }

    #[test]
    fn test_bounds_are_respected() {
        // Minimum of x at the lower bound
        let objfn = |x: &[f64]| x[0];
        let (fval, xopt) = optimize_theta(objfn, &arr1(&[0.5]), &[(-2., 2.)], CobylaParams::default());
        assert!(xopt[0] >= -2. - 1e-6);
        assert_abs_diff_eq!(fval, -2., epsilon = 1e-2);
    }
}
