pub fn assert_equal(left: f64, right: f64) {
    assert_equal_reltol(left, right, 1e-9);
}

pub fn assert_equal_reltol(left: f64, right: f64, reltol: f64) {
    let max = left.abs().max(right.abs());
    if max < f64::EPSILON {
        // both values are effectively zero
        return;
    }
    let abs_diff = (left - right).abs();
    let rel_diff = abs_diff / max;

    assert!(
        rel_diff < reltol,
        "Assertion failed: left ({}) and right ({}) are not approximately equal. Relative difference: {}. Absolute difference: {}",
        left,
        right,
        rel_diff,
        abs_diff,
    );
}

/// Compares two matrices stored as flat slices (any consistent ordering).
///
/// The tolerance is relative to the largest magnitude in `expected`, so tiny
/// entries of a badly scaled matrix are judged against the matrix as a whole
/// rather than against themselves.
pub fn assert_matrix_equal_reltol(actual: &[f64], expected: &[f64], reltol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Assertion failed: matrices have {} and {} entries",
        actual.len(),
        expected.len()
    );
    let scale = expected
        .iter()
        .fold(0.0_f64, |acc, x| acc.max(x.abs()));
    let allowed = reltol * scale.max(f64::MIN_POSITIVE);

    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let abs_diff = (a - e).abs();
        assert!(
            abs_diff <= allowed,
            "Assertion failed: entry {} is {} but expected {}. Absolute difference: {} exceeds {} ({} of matrix scale {})",
            i,
            a,
            e,
            abs_diff,
            allowed,
            reltol,
            scale,
        );
    }
}

/// Asserts every entry of a square matrix (column-major, `dim` x `dim`)
/// matches its transpose to within `abstol`.
pub fn assert_symmetric(matrix: &[f64], dim: usize, abstol: f64) {
    assert_eq!(matrix.len(), dim * dim, "Assertion failed: not a {dim}x{dim} matrix");
    for r in 0..dim {
        for c in 0..r {
            let upper = matrix[c * dim + r];
            let lower = matrix[r * dim + c];
            assert!(
                (upper - lower).abs() <= abstol,
                "Assertion failed: entry ({r},{c}) = {upper} but ({c},{r}) = {lower}"
            );
        }
    }
}
