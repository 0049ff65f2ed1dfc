use nalgebra::{Matrix3, Matrix3x6, Matrix6, Matrix6x3};

use crate::{
    config::ControllerConfig,
    linalg::{assemble_blocks, invert},
    newton::NewtonIterator,
    state_space::StateSpaceModel,
    LqrErrors, Matrix12,
};

/// Discrete algebraic Riccati solver for a fixed (A_d, Q, R) and a
/// time-varying B_d.
///
/// With N = [[A_d, 0], [-Q, I]] and L = [[I, B_d R^-1 B_d^T], [0, A_d^T]],
/// H = (N + L)^-1 (N - L) has its stable invariant subspace spanned by the
/// columns of H - sqrt(H^2). Writing the left block column of H - S as
/// [X1; X2] gives the stabilizing solution P = X2 X1^-1.
///
/// The solver owns every intermediate matrix, so a solve does not allocate.
/// Reference: Sutherland et al., arXiv:1707.04959, appendix B.
#[derive(Clone, Debug)]
pub struct RiccatiSolver {
    min_pivot_ratio: f64,
    n: Matrix12,
    r_inv: Matrix3<f64>,
    a_d_t: Matrix6<f64>,
    r_inv_b_d_t: Matrix3x6<f64>,
    b_d_r_inv_b_d_t: Matrix6<f64>,
    l: Matrix12,
    n_minus_l: Matrix12,
    h: Matrix12,
    h_minus_s: Matrix12,
    newton: NewtonIterator,
}

impl RiccatiSolver {
    pub fn new(model: &StateSpaceModel, config: &ControllerConfig) -> Result<Self, LqrErrors> {
        let identity = Matrix6::identity();
        let zero = Matrix6::zeros();

        let mut n = Matrix12::zeros();
        assemble_blocks(&mut n, model.a_d(), &zero, &(-model.q()), &identity);

        let r_inv = invert(model.r(), "R", config.min_pivot_ratio)?;
        let newton = NewtonIterator::new(
            config.tolerances()?,
            config.max_newton_iterations,
            config.min_pivot_ratio,
        );

        Ok(Self {
            min_pivot_ratio: config.min_pivot_ratio,
            n,
            r_inv,
            a_d_t: model.a_d().transpose(),
            r_inv_b_d_t: Matrix3x6::zeros(),
            b_d_r_inv_b_d_t: Matrix6::zeros(),
            l: Matrix12::zeros(),
            n_minus_l: Matrix12::zeros(),
            h: Matrix12::zeros(),
            h_minus_s: Matrix12::zeros(),
            newton,
        })
    }

    /// Solves for P(t) given the current discrete input matrix.
    ///
    /// The returned P is symmetrized, P = (P + P^T) / 2.
    pub fn solve(&mut self, b_d: &Matrix6x3<f64>) -> Result<Matrix6<f64>, LqrErrors> {
        // L = [I   B_d R^-1 B_d^T]
        //     [0   A_d^T         ]
        self.r_inv_b_d_t = self.r_inv * b_d.transpose();
        self.b_d_r_inv_b_d_t.gemm(1.0, b_d, &self.r_inv_b_d_t, 0.0);
        assemble_blocks(
            &mut self.l,
            &Matrix6::identity(),
            &self.b_d_r_inv_b_d_t,
            &Matrix6::zeros(),
            &self.a_d_t,
        );

        // H = (N + L)^-1 (N - L)
        let n_plus_l_inv = invert(&(self.n + self.l), "N + L", self.min_pivot_ratio)?;
        self.n_minus_l = self.n - self.l;
        self.h.gemm(1.0, &n_plus_l_inv, &self.n_minus_l, 0.0);

        let s = self.newton.solve(&self.h)?;

        // [X1  ~] = H - S
        // [X2  ~]
        self.h_minus_s = self.h - s;
        let x1 = self.h_minus_s.fixed_view::<6, 6>(0, 0).into_owned();
        let x2 = self.h_minus_s.fixed_view::<6, 6>(6, 0).into_owned();
        let x1_inv = invert(&x1, "X1", self.min_pivot_ratio)?;

        let p = x2 * x1_inv;
        let p = (p + p.transpose()) * 0.5;

        tracing::debug!(
            iterations = self.newton.iterations(),
            residual = self.newton.residuals().last().copied().unwrap_or(f64::NAN),
            "riccati solution found"
        );
        Ok(p)
    }

    pub fn n(&self) -> &Matrix12 {
        &self.n
    }

    /// H from the most recent solve.
    pub fn hamiltonian(&self) -> &Matrix12 {
        &self.h
    }

    pub fn newton(&self) -> &NewtonIterator {
        &self.newton
    }
}
