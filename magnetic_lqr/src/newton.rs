use tolerance::{max_abs_difference, Tolerances};

use crate::{linalg::invert, LqrErrors, Matrix12};

/// Newton iteration for the square root S of H^2 that selects sign(H) * H.
///
/// Scratch matrices are owned by the iterator and reused on every call.
/// Every solve starts again from the identity.
#[derive(Clone, Debug)]
pub struct NewtonIterator {
    tolerances: Tolerances,
    max_iterations: usize,
    min_pivot_ratio: f64,
    s: Matrix12,
    s_prev: Matrix12,
    s_inv: Matrix12,
    h_squared: Matrix12,
    residuals: Vec<f64>,
}

impl NewtonIterator {
    pub fn new(tolerances: Tolerances, max_iterations: usize, min_pivot_ratio: f64) -> Self {
        Self {
            tolerances,
            max_iterations,
            min_pivot_ratio,
            s: Matrix12::identity(),
            s_prev: Matrix12::identity(),
            s_inv: Matrix12::identity(),
            h_squared: Matrix12::zeros(),
            residuals: Vec::with_capacity(max_iterations),
        }
    }

    /// Iterates S_{k+1} = (S_k + S_k^-1 H^2) / 2 from S_0 = I until no entry
    /// of S_{k+1} - S_k exceeds the tolerance.
    pub fn solve(&mut self, h: &Matrix12) -> Result<&Matrix12, LqrErrors> {
        self.s.fill_with_identity();
        self.residuals.clear();
        self.h_squared.gemm(1.0, h, h, 0.0);

        loop {
            self.s_prev.copy_from(&self.s);
            self.s_inv = invert(&self.s, "newton iterate S", self.min_pivot_ratio)?;
            self.s.gemm(0.5, &self.s_inv, &self.h_squared, 0.5);

            let residual = max_abs_difference(self.s.as_slice(), self.s_prev.as_slice());
            self.residuals.push(residual);
            tracing::trace!(iteration = self.residuals.len(), residual, "newton step");

            if self.tolerances.check_residual(residual) {
                return Ok(&self.s);
            }
            if !residual.is_finite() || self.residuals.len() >= self.max_iterations {
                return Err(LqrErrors::Convergence {
                    iterations: self.residuals.len(),
                    residual,
                });
            }
        }
    }

    /// Root found by the last successful `solve`.
    pub fn root(&self) -> &Matrix12 {
        &self.s
    }

    pub fn iterations(&self) -> usize {
        self.residuals.len()
    }

    /// Max-abs step size of every iteration of the last `solve`.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}
