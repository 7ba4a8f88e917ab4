pub type Result<T> = anyhow::Result<T>;

pub type MatX3<T> = Vec<[T;3]>;  // Nx3 matrix
pub type Mat33<T> = [[T;3];3];   // 3x3 matrix
pub type Point = [f64; 2];       // (x, y) on a plot
pub type Series = Vec<Point>;


/// Fractional -> cartesian, rows of `cell` are the lattice vectors.
pub fn frac_to_cart(frac: &[f64; 3], cell: &Mat33<f64>) -> [f64; 3] {
    let mut ret = [0.0; 3];
    for i in 0 .. 3 {
        for j in 0 .. 3 {
            ret[j] += frac[i] * cell[i][j];
        }
    }
    ret
}


pub fn mat33_det(c: &Mat33<f64>) -> f64 {
    // |00 01 02|
    // |10 11 12|
    // |20 21 22|
    c[0][0] * (c[1][1] * c[2][2] - c[2][1] * c[1][2]) -
        c[0][1] * (c[1][0] * c[2][2] - c[1][2] * c[2][0]) +
        c[0][2] * (c[1][0] * c[2][1] - c[1][1] * c[2][0])
}


/// Inverse of a 3x3 matrix, `None` for a singular one.
pub fn mat33_inv(c: &Mat33<f64>) -> Option<Mat33<f64>> {
    let det = mat33_det(c);
    if det.abs() < 1E-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (c[1][1] * c[2][2] - c[1][2] * c[2][1]) * inv_det,
            (c[0][2] * c[2][1] - c[0][1] * c[2][2]) * inv_det,
            (c[0][1] * c[1][2] - c[0][2] * c[1][1]) * inv_det,
        ],
        [
            (c[1][2] * c[2][0] - c[1][0] * c[2][2]) * inv_det,
            (c[0][0] * c[2][2] - c[0][2] * c[2][0]) * inv_det,
            (c[0][2] * c[1][0] - c[0][0] * c[1][2]) * inv_det,
        ],
        [
            (c[1][0] * c[2][1] - c[1][1] * c[2][0]) * inv_det,
            (c[0][1] * c[2][0] - c[0][0] * c[2][1]) * inv_det,
            (c[0][0] * c[1][1] - c[0][1] * c[1][0]) * inv_det,
        ],
    ])
}


/// Cartesian -> fractional with a precomputed inverse cell.
pub fn cart_to_frac(cart: &[f64; 3], inv_cell: &Mat33<f64>) -> [f64; 3] {
    frac_to_cart(cart, inv_cell)
}


pub fn norm3(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}


#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mat33_inv() {
        let cell = [[2.0, 0.0, 0.0],
                    [1.0, 3.0, 0.0],
                    [0.0, 0.5, 4.0]];
        let inv = mat33_inv(&cell).unwrap();
        let cart = frac_to_cart(&[0.25, 0.5, 0.75], &cell);
        let frac = cart_to_frac(&cart, &inv);
        assert_abs_diff_eq!(frac[0], 0.25, epsilon = 1E-12);
        assert_abs_diff_eq!(frac[1], 0.50, epsilon = 1E-12);
        assert_abs_diff_eq!(frac[2], 0.75, epsilon = 1E-12);
        assert_abs_diff_eq!(mat33_det(&cell), 24.0, epsilon = 1E-12);
    }

    #[test]
    fn test_singular() {
        let cell = [[1.0, 0.0, 0.0],
                    [2.0, 0.0, 0.0],
                    [0.0, 0.0, 1.0]];
        assert!(mat33_inv(&cell).is_none());
    }
}
