use nalgebra::{Matrix3, Matrix3x6, Matrix6, Matrix6x3, Vector3, Vector6};

use crate::{linalg::invert, LqrErrors};

/// K = (R + B_d^T P B_d)^-1 B_d^T P A_d.
///
/// The bracketed term is positive definite for R > 0 and P >= 0, but is
/// still inverted with the pivot check.
pub fn compute_gain(
    p: &Matrix6<f64>,
    a_d: &Matrix6<f64>,
    b_d: &Matrix6x3<f64>,
    r: &Matrix3<f64>,
    min_pivot_ratio: f64,
) -> Result<Matrix3x6<f64>, LqrErrors> {
    let p_a_d = p * a_d;
    let p_b_d = p * b_d;
    let b_d_t_p_a_d = b_d.transpose() * p_a_d;
    let r_plus_b_d_t_p_b_d = r + b_d.transpose() * p_b_d;

    let inv = invert(&r_plus_b_d_t_p_b_d, "R + B_d^T P B_d", min_pivot_ratio)?;
    Ok(inv * b_d_t_p_a_d)
}

/// u = -K x, the dipole command (A m^2).
pub fn command(k: &Matrix3x6<f64>, x: &Vector6<f64>) -> Vector3<f64> {
    -(k * x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ControllerConfig, input_matrix::InputMatrixBuilder, riccati::RiccatiSolver,
        state_space::StateSpaceModel,
    };
    use utilities::assert_matrix_equal_reltol;

    fn scenario_a() -> (StateSpaceModel, Matrix6x3<f64>, Matrix6<f64>) {
        let config = ControllerConfig::default();
        let model = StateSpaceModel::new(&config).unwrap();
        let input = InputMatrixBuilder::new(&model, &config).unwrap();
        let mut solver = RiccatiSolver::new(&model, &config).unwrap();
        let b_d = input.build(&Vector3::new(2e-5, 1e-5, 3e-5)).unwrap().discrete;
        let p = solver.solve(&b_d).unwrap();
        (model, b_d, p)
    }

    #[test]
    fn matches_reference_gain() {
        let (model, b_d, p) = scenario_a();
        let k = compute_gain(&p, model.a_d(), &b_d, model.r(), 1e-12).unwrap();
        #[rustfmt::skip]
        let expected = Matrix3x6::from_row_slice(&[
            -9.049720171730623e-08, 8.589085223965038e-09, 8.905308223135239e-08, -2.162926137527471e-07, 3.681894043532963e-05, 4.946440155697378e-05,
            -6.880644375685848e-10, -4.9552236397042064e-08, 5.783982810635319e-08, 1.7048523915315442e-05, -5.268026320275207e-05, 1.743468386514457e-05,
            6.056082262406035e-08, 1.0791355316370665e-08, -7.864866418968599e-08, -5.5386462292699686e-06, -6.985872555969064e-06, -3.878782899303071e-05,
        ]);
        assert_matrix_equal_reltol(k.as_slice(), expected.as_slice(), 1e-6);
    }

    #[test]
    fn gain_is_a_pure_function() {
        let (model, b_d, p) = scenario_a();
        let k1 = compute_gain(&p, model.a_d(), &b_d, model.r(), 1e-12).unwrap();
        let k2 = compute_gain(&p, model.a_d(), &b_d, model.r(), 1e-12).unwrap();
        assert_eq!(
            k1.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>(),
            k2.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn zero_state_gives_zero_command() {
        let (model, b_d, p) = scenario_a();
        let k = compute_gain(&p, model.a_d(), &b_d, model.r(), 1e-12).unwrap();
        let u = command(&k, &Vector6::zeros());
        assert!(u.iter().all(|&x| x == 0.0));

        let arbitrary = Matrix3x6::from_fn(|r, c| (r as f64 - 1.0) * (c as f64 + 0.5));
        assert!(command(&arbitrary, &Vector6::zeros()).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn command_opposes_gain() {
        let k = Matrix3x6::from_fn(|r, c| if r == c { 2.0 } else { 0.0 });
        let x = Vector6::new(1.0, -2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(command(&k, &x), Vector3::new(-2.0, 4.0, -6.0));
    }

    #[test]
    fn singular_weight_is_reported() {
        let (model, b_d, _) = scenario_a();
        assert!(matches!(
            compute_gain(&Matrix6::zeros(), model.a_d(), &b_d, &Matrix3::zeros(), 1e-12),
            Err(LqrErrors::SingularMatrix { matrix: "R + B_d^T P B_d", .. })
        ));
    }
}
