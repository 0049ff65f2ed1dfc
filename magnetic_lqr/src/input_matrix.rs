use nalgebra::{Matrix3, Matrix6, Matrix6x3, Vector3};

use crate::{
    config::ControllerConfig,
    linalg::{invert, stack_vertical},
    state_space::StateSpaceModel,
    LqrErrors,
};

/// Input matrices derived from one field measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct InputMatrices {
    /// [b]x, the cross-product matrix of the field.
    pub skew: Matrix3<f64>,
    pub continuous: Matrix6x3<f64>,
    pub discrete: Matrix6x3<f64>,
}

/// Maps a body-frame field measurement to the continuous and discrete input matrices.
///
/// J^-1 and the continuous-to-discrete transform -A_c^-1 (I - A_d) are
/// computed once at construction and reused every cycle.
#[derive(Clone, Debug)]
pub struct InputMatrixBuilder {
    j_inv: Matrix3<f64>,
    transform: Matrix6<f64>,
    min_field_norm: f64,
}

impl InputMatrixBuilder {
    pub fn new(model: &StateSpaceModel, config: &ControllerConfig) -> Result<Self, LqrErrors> {
        let j_inv = invert(model.inertia(), "J", config.min_pivot_ratio)?;
        let a_c_inv = invert(model.a_c(), "A_c", config.min_pivot_ratio)?;

        let i_minus_a_d = Matrix6::identity() - model.a_d();
        let mut transform = Matrix6::zeros();
        transform.gemm(-1.0, &a_c_inv, &i_minus_a_d, 0.0);

        Ok(Self {
            j_inv,
            transform,
            min_field_norm: config.min_field_norm,
        })
    }

    pub fn transform(&self) -> &Matrix6<f64> {
        &self.transform
    }

    pub fn build(&self, b: &Vector3<f64>) -> Result<InputMatrices, LqrErrors> {
        // the projection only depends on the direction of b, so it is formed
        // from b / max|b_i| to keep b^T b finite for any finite field
        let scale = b.amax();
        let unit = if scale > 0.0 { b / scale } else { *b };
        let norm = scale * unit.norm();
        // a dipole crossed with b has no torque component along b, so the
        // projection below is undefined as b -> 0
        if !(norm.is_finite() && norm > self.min_field_norm) {
            return Err(LqrErrors::DegenerateInput { norm });
        }

        let skew = skew_symmetric(b);
        let skew_unit = skew_symmetric(&unit);
        let quotient = (skew_unit * skew_unit) / unit.dot(&unit);
        let continuous = stack_vertical(&Matrix3::zeros(), &(self.j_inv * quotient));
        let discrete = self.transform * continuous;

        Ok(InputMatrices {
            skew,
            continuous,
            discrete,
        })
    }
}

/// Cross-product matrix: `skew_symmetric(b) * v == b.cross(&v)`.
pub fn skew_symmetric(b: &Vector3<f64>) -> Matrix3<f64> {
    b.cross_matrix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use utilities::assert_matrix_equal_reltol;

    fn builder() -> InputMatrixBuilder {
        let config = ControllerConfig::default();
        let model = StateSpaceModel::new(&config).unwrap();
        InputMatrixBuilder::new(&model, &config).unwrap()
    }

    #[test]
    fn skew_is_antisymmetric_and_annihilates_b() {
        for b in [
            Vector3::new(2e-5, 1e-5, 3e-5),
            Vector3::new(-4.2e-5, 0.0, 1.7e-6),
            Vector3::new(1.0, -2.0, 3.0),
            Vector3::zeros(),
        ] {
            let skew = skew_symmetric(&b);
            assert_eq!(skew.transpose(), -skew);
            assert_relative_eq!(skew * b, Vector3::zeros(), epsilon = 1e-20);
        }
    }

    #[test]
    fn skew_layout() {
        let skew = skew_symmetric(&Vector3::new(1.0, 2.0, 3.0));
        #[rustfmt::skip]
        let expected = Matrix3::new(
            0.0, -3.0, 2.0,
            3.0, 0.0, -1.0,
            -2.0, 1.0, 0.0,
        );
        assert_eq!(skew, expected);
    }

    #[test]
    fn continuous_matrix_projects_orthogonal_to_field() {
        let b = Vector3::new(2e-5, 1e-5, 3e-5);
        let m = builder().build(&b).unwrap();
        let top = m.continuous.fixed_view::<3, 3>(0, 0);
        assert!(top.iter().all(|&x| x == 0.0));

        // J * bottom = [b]x^2 / |b|^2 = -(I - b b^T / |b|^2)
        let j = Matrix3::from_diagonal(&Vector3::new(3.196587857e-2, 3.229090604e-2, 7.02534780e-3));
        let projection = j * m.continuous.fixed_view::<3, 3>(3, 0);
        let expected = -(Matrix3::identity() - b * b.transpose() / b.dot(&b));
        assert_relative_eq!(projection, expected, epsilon = 1e-12);
        assert_relative_eq!(projection * b, Vector3::zeros(), epsilon = 1e-18);
    }

    #[test]
    fn discrete_matrix_matches_reference() {
        let m = builder().build(&Vector3::new(2e-5, 1e-5, 3e-5)).unwrap();
        #[rustfmt::skip]
        let expected = Matrix6x3::from_row_slice(&[
            -178.60495467483028, 35.830217730579825, 107.12656387302694,
            35.39239562531402, -230.0505715645411, 53.088593437971035,
            488.28856475599986, 243.96223771866212, -406.8464557435539,
            -89.82156340634855, 17.655407077287542, 53.99590657846986,
            17.696126256440916, -115.02482066686592, 26.544189384661372,
            244.0048625552745, 122.00905440996131, -203.33959317350343,
        ]);
        assert_matrix_equal_reltol(m.discrete.as_slice(), expected.as_slice(), 1e-8);
    }

    #[test]
    fn input_matrices_are_scale_invariant_in_b() {
        let builder = builder();
        let b = Vector3::new(2e-5, 1e-5, 3e-5);
        let m1 = builder.build(&b).unwrap();
        let m2 = builder.build(&(b * 3.0)).unwrap();
        assert_relative_eq!(m1.discrete, m2.discrete, max_relative = 1e-12);
    }

    #[test]
    fn rejects_zero_and_tiny_fields() {
        let builder = builder();
        assert!(matches!(
            builder.build(&Vector3::zeros()),
            Err(LqrErrors::DegenerateInput { norm }) if norm == 0.0
        ));
        assert!(matches!(
            builder.build(&Vector3::new(1e-12, 0.0, 0.0)),
            Err(LqrErrors::DegenerateInput { .. })
        ));
        assert!(matches!(
            builder.build(&Vector3::new(f64::NAN, 1e-5, 0.0)),
            Err(LqrErrors::DegenerateInput { .. })
        ));
    }

    #[test]
    fn huge_finite_field_is_not_degenerate() {
        let builder = builder();
        let b = Vector3::new(2e-5, 1e-5, 3e-5);
        let huge = builder.build(&(b * 1e165)).unwrap();
        let nominal = builder.build(&b).unwrap();
        assert!(huge.discrete.iter().all(|x| x.is_finite()));
        assert_matrix_equal_reltol(huge.discrete.as_slice(), nominal.discrete.as_slice(), 1e-12);
    }

    #[test]
    fn non_finite_fields_are_degenerate() {
        let builder = builder();
        for b in [
            Vector3::new(f64::INFINITY, 1e-5, 0.0),
            Vector3::new(f64::NAN, f64::NAN, f64::NAN),
        ] {
            assert!(matches!(
                builder.build(&b),
                Err(LqrErrors::DegenerateInput { norm }) if !norm.is_finite()
            ));
        }
    }

    #[test]
    fn zero_field_rejected_even_without_threshold() {
        let config = ControllerConfig {
            min_field_norm: 0.0,
            ..Default::default()
        };
        let model = StateSpaceModel::new(&config).unwrap();
        let builder = InputMatrixBuilder::new(&model, &config).unwrap();
        assert!(builder.build(&Vector3::zeros()).is_err());
        assert!(builder.build(&Vector3::new(1e-12, 0.0, 0.0)).is_ok());
    }

    #[test]
    fn zero_mean_motion_is_singular() {
        let config = ControllerConfig {
            mean_motion: 0.0,
            ..Default::default()
        };
        let model = StateSpaceModel::new(&config).unwrap();
        assert!(matches!(
            InputMatrixBuilder::new(&model, &config),
            Err(LqrErrors::SingularMatrix { matrix: "A_c", .. })
        ));
    }

    #[test]
    fn repeated_builds_are_identical() {
        let builder = builder();
        let b = Vector3::new(2e-5, 1e-5, 3e-5);
        assert_eq!(builder.build(&b).unwrap(), builder.build(&b).unwrap());
    }
}
