//! Ridge-regularized polynomial fitting for cluster boundaries.
//!
//! Each cluster of obstacle points is summarized by a polynomial
//! `y = c0 + c1*x + ... + cd*x^d` fitted to the planar projection of its
//! points. The fit minimizes `||Xw - y||^2 + lambda * ||w||^2` and is
//! solved in closed form via the normal equations
//! `(X^T X + lambda * I) w = X^T y`, factored with a Cholesky
//! decomposition in f64.
//!
//! With `lambda > 0` the system matrix is positive definite for any
//! non-empty input, so the fit always succeeds, down to a single point.
//! With `lambda = 0` the fit reduces to ordinary least squares and needs
//! at least `degree + 1` points with distinct x values; degenerate inputs
//! surface as [`FitError::SingularSystem`].

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors that can occur when fitting a polynomial.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FitError {
    /// The fitter was invoked on zero points. The orchestrator never does
    /// this for clusters (clustering guarantees they are non-empty), so
    /// seeing it indicates a logic error in the caller.
    #[error("cannot fit a polynomial to an empty point set")]
    EmptyInput,

    /// The normal equations are singular: too few points, or too few
    /// distinct x values, for the requested degree with lambda = 0.
    #[error("singular normal equations; add points or use a positive lambda")]
    SingularSystem,
}

/// A fitted polynomial, lowest-order coefficient first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Coefficients `[c0, c1, ..., cd]` for `y = c0 + c1*x + ... + cd*x^d`.
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    /// Degree of the polynomial.
    #[inline]
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Evaluate the polynomial at `x` using Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    /// Euclidean norm of the coefficient vector.
    pub fn coefficient_norm(&self) -> f64 {
        self.coefficients.iter().map(|c| c * c).sum::<f64>().sqrt()
    }
}

/// Build the Vandermonde design matrix with rows `[1, x, x^2, ..., x^degree]`.
fn design_matrix(xs: &[f32], degree: usize) -> DMatrix<f64> {
    let n = xs.len();
    let mut matrix = DMatrix::zeros(n, degree + 1);
    for (i, &x) in xs.iter().enumerate() {
        let x = f64::from(x);
        let mut power = 1.0;
        for j in 0..=degree {
            matrix[(i, j)] = power;
            power *= x;
        }
    }
    matrix
}

/// Fit a ridge-regularized polynomial of the given degree to (x, y) pairs.
///
/// # Arguments
///
/// * `xs`, `ys` - Point coordinates; both slices must have the same length
/// * `degree` - Polynomial degree (the fit has `degree + 1` coefficients)
/// * `lambda` - Regularization strength, `>= 0`
///
/// # Returns
///
/// The fitted [`Polynomial`]. Increasing `lambda` monotonically shrinks
/// the coefficient norm for fixed inputs.
///
/// # Errors
///
/// * [`FitError::EmptyInput`] if `xs` is empty
/// * [`FitError::SingularSystem`] if `lambda = 0` and the normal equations
///   are not positive definite
pub fn fit_polynomial(
    xs: &[f32],
    ys: &[f32],
    degree: usize,
    lambda: f64,
) -> Result<Polynomial, FitError> {
    debug_assert_eq!(xs.len(), ys.len(), "xs and ys must have same length");

    if xs.is_empty() {
        return Err(FitError::EmptyInput);
    }

    let x = design_matrix(xs, degree);
    let y = DVector::from_iterator(ys.len(), ys.iter().map(|&v| f64::from(v)));

    let mut normal = x.transpose() * &x;
    let rhs = x.transpose() * y;

    for i in 0..=degree {
        normal[(i, i)] += lambda;
    }

    let cholesky = normal.cholesky().ok_or(FitError::SingularSystem)?;
    let w = cholesky.solve(&rhs);

    Ok(Polynomial {
        coefficients: w.iter().copied().collect(),
    })
}
