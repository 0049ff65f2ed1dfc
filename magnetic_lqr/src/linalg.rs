use nalgebra::{
    allocator::Allocator, DefaultAllocator, Dim, DimMin, Matrix3, Matrix6, Matrix6x3, OMatrix,
};

use crate::{LqrErrors, Matrix12};

/// Inverts `m` through its LU decomposition.
///
/// The matrix is rejected as singular when the ratio of its smallest to its
/// largest pivot magnitude is at or below `min_pivot_ratio`.
pub fn invert<D>(
    m: &OMatrix<f64, D, D>,
    matrix: &'static str,
    min_pivot_ratio: f64,
) -> Result<OMatrix<f64, D, D>, LqrErrors>
where
    D: DimMin<D, Output = D>,
    DefaultAllocator: Allocator<D, D> + Allocator<D>,
{
    let lu = m.clone_owned().lu();
    let pivot_ratio = pivot_ratio(&lu.u());
    if !(pivot_ratio > min_pivot_ratio) {
        return Err(LqrErrors::SingularMatrix { matrix, pivot_ratio });
    }
    lu.try_inverse()
        .ok_or(LqrErrors::SingularMatrix { matrix, pivot_ratio })
}

fn pivot_ratio<D>(u: &OMatrix<f64, D, D>) -> f64
where
    D: Dim,
    DefaultAllocator: Allocator<D, D>,
{
    let mut min = f64::INFINITY;
    let mut max = 0.0_f64;
    for i in 0..u.nrows() {
        let p = u[(i, i)].abs();
        // NaN pivots poison the ratio
        if p.is_nan() {
            return f64::NAN;
        }
        min = min.min(p);
        max = max.max(p);
    }
    if max == 0.0 { 0.0 } else { min / max }
}

/// Writes the 2x2 block matrix [[a, b], [c, d]] into `out`.
pub fn assemble_blocks(
    out: &mut Matrix12,
    a: &Matrix6<f64>,
    b: &Matrix6<f64>,
    c: &Matrix6<f64>,
    d: &Matrix6<f64>,
) {
    out.fixed_view_mut::<6, 6>(0, 0).copy_from(a);
    out.fixed_view_mut::<6, 6>(0, 6).copy_from(b);
    out.fixed_view_mut::<6, 6>(6, 0).copy_from(c);
    out.fixed_view_mut::<6, 6>(6, 6).copy_from(d);
}

/// Stacks two 3x3 blocks vertically.
pub fn stack_vertical(top: &Matrix3<f64>, bottom: &Matrix3<f64>) -> Matrix6x3<f64> {
    let mut out = Matrix6x3::zeros();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(top);
    out.fixed_view_mut::<3, 3>(3, 0).copy_from(bottom);
    out
}
