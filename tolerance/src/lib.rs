/// Absolute element-wise convergence criterion for iterative matrix solvers.
///
/// Two iterates are considered converged when no pair of corresponding
/// entries differs by more than `abs_tol`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    abs_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { abs_tol: 1e-3 }
    }
}

impl Tolerances {
    /// Returns `None` unless `abs_tol` is finite and strictly positive.
    pub fn new(abs_tol: f64) -> Option<Self> {
        if abs_tol.is_finite() && abs_tol > 0.0 {
            Some(Self { abs_tol })
        } else {
            None
        }
    }

    pub fn abs_tol(&self) -> f64 {
        self.abs_tol
    }

    /// True when the residual is finite and does not exceed the tolerance.
    pub fn check_residual(&self, residual: f64) -> bool {
        residual.is_finite() && residual <= self.abs_tol
    }

    pub fn check_elements(&self, current: &[f64], previous: &[f64]) -> bool {
        self.check_residual(max_abs_difference(current, previous))
    }
}

/// Largest absolute difference between corresponding entries.
///
/// NaN in either input propagates to the result so a diverged iterate can
/// never look converged. Slices of different length compare over the shorter.
pub fn max_abs_difference(a: &[f64], b: &[f64]) -> f64 {
    let mut max = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let diff = (x - y).abs();
        if diff.is_nan() {
            return f64::NAN;
        }
        if diff > max {
            max = diff;
        }
    }
    max
}
