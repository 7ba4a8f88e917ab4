use anyhow::{
    Context,
    ensure,
};

use crate::{
    types::{
        Result,
        Mat33,
        MatX3,
        frac_to_cart,
        cart_to_frac,
        mat33_inv,
        norm3,
    },
    vasp_parsers::poscar::Poscar,
};


/// Initial and final states must describe the same atoms in the same order.
pub fn check_compatible(initial: &Poscar, fin: &Poscar) -> Result<()> {
    ensure!(initial.nions() == fin.nions(),
        "Initial state has {} atoms but final state has {} atoms.", initial.nions(), fin.nions());
    ensure!(initial.ion_types == fin.ion_types && initial.ions_per_type == fin.ions_per_type,
        "Element symbols and counts of initial state ({:?} {:?}) and final state ({:?} {:?}) are different.",
        initial.ion_types, initial.ions_per_type, fin.ion_types, fin.ions_per_type);
    Ok(())
}


/// Fractional displacement of each atom from initial to final state.
///
/// With `wrap` on, every component is folded into [-0.5, 0.5] so the atom moves to the
/// nearest periodic image of its final position instead of crossing the cell.
pub fn frac_displacements(initial: &Poscar, fin: &Poscar, wrap: bool) -> MatX3<f64> {
    initial.pos_frac.iter()
        .zip(fin.pos_frac.iter())
        .map(|(a, b)| {
            let mut d = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            if wrap {
                for v in d.iter_mut() {
                    *v -= v.round();
                }
            }
            d
        })
        .collect()
}


pub fn lerp_cell(a: &Mat33<f64>, b: &Mat33<f64>, t: f64) -> Mat33<f64> {
    let mut ret = [[0.0; 3]; 3];
    for i in 0 .. 3 {
        for j in 0 .. 3 {
            ret[i][j] = a[i][j] + (b[i][j] - a[i][j]) * t;
        }
    }
    ret
}


/// Linearly interpolated images, both end points included: `nimages + 2` structures.
///
/// The final state is rebuilt from the unwrapped displacements, so it may sit in a
/// neighbouring cell compared to the input file.
pub fn linear_images(initial: &Poscar, fin: &Poscar, nimages: usize, wrap: bool) -> Result<Vec<Poscar>> {
    check_compatible(initial, fin)?;

    let disp = frac_displacements(initial, fin, wrap);
    let nseg = (nimages + 1) as f64;

    let images = (0 ..= nimages + 1)
        .map(|k| {
            let t = k as f64 / nseg;
            let cell = lerp_cell(&initial.cell, &fin.cell, t);
            let frac = initial.pos_frac.iter()
                .zip(disp.iter())
                .map(|(p, d)| [p[0] + d[0] * t, p[1] + d[1] * t, p[2] + d[2] * t])
                .collect::<MatX3<f64>>();
            Poscar::from_frac(
                format!("image {:02} of {}", k, initial.comment),
                cell,
                initial.ion_types.clone(),
                initial.ions_per_type.clone(),
                frac,
                initial.constraints.clone(),
            )
        })
        .collect();

    Ok(images)
}


/// Distance between two cartesian positions under the minimum image convention.
pub fn min_image_distance(a: &[f64; 3], b: &[f64; 3], cell: &Mat33<f64>, inv_cell: &Mat33<f64>) -> f64 {
    let d = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let mut f = cart_to_frac(&d, inv_cell);
    for v in f.iter_mut() {
        *v -= v.round();
    }
    norm3(&frac_to_cart(&f, cell))
}


/// Shortest interatomic distance and the atoms involved, indices start from 1.
pub fn min_interatomic_distance(pos: &Poscar) -> Result<Option<(f64, usize, usize)>> {
    let inv_cell = mat33_inv(&pos.cell).context("The lattice vectors are linearly dependent.")?;
    let n = pos.nions();
    let mut ret: Option<(f64, usize, usize)> = None;

    for i in 0 .. n {
        for j in i + 1 .. n {
            let d = min_image_distance(&pos.pos_cart[i], &pos.pos_cart[j], &pos.cell, &inv_cell);
            if ret.map_or(true, |(dmin, _, _)| d < dmin) {
                ret = Some((d, i + 1, j + 1));
            }
        }
    }

    Ok(ret)
}


/// Largest cartesian displacement between the first and the last image, index starts from 1.
pub fn max_displacement(images: &[Poscar]) -> Option<(f64, usize)> {
    let first = images.first()?;
    let last = images.last()?;
    first.pos_cart.iter()
        .zip(last.pos_cart.iter())
        .map(|(a, b)| norm3(&[b[0] - a[0], b[1] - a[1], b[2] - a[2]]))
        .enumerate()
        .fold(None, |acc: Option<(f64, usize)>, (i, d)| {
            match acc {
                Some((dmax, _)) if dmax >= d => acc,
                _ => Some((d, i + 1)),
            }
        })
}


#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cubic(comment: &str, frac: MatX3<f64>) -> Poscar {
        let n = frac.len() as i32;
        Poscar::from_frac(
            comment.to_string(),
            [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec!["H".to_string()],
            vec![n],
            frac,
            None,
        )
    }

    #[test]
    fn test_wrap_picks_shortest_path() {
        let is = cubic("is", vec![[0.95, 0.5, 0.5]]);
        let fs = cubic("fs", vec![[0.05, 0.5, 0.5]]);

        let d = frac_displacements(&is, &fs, true);
        assert_abs_diff_eq!(d[0][0], 0.1, epsilon = 1E-12);

        let d = frac_displacements(&is, &fs, false);
        assert_abs_diff_eq!(d[0][0], -0.9, epsilon = 1E-12);
    }

    #[test]
    fn test_linear_images() {
        let is = cubic("is", vec![[0.1, 0.1, 0.1], [0.9, 0.5, 0.5]]);
        let fs = cubic("fs", vec![[0.3, 0.1, 0.1], [0.1, 0.5, 0.5]]);

        let images = linear_images(&is, &fs, 3, true).unwrap();
        assert_eq!(images.len(), 5);

        // end points are reproduced
        assert_abs_diff_eq!(images[0].pos_frac[0][0], 0.1, epsilon = 1E-12);
        assert_abs_diff_eq!(images[4].pos_frac[0][0], 0.3, epsilon = 1E-12);
        assert_abs_diff_eq!(images[2].pos_frac[0][0], 0.2, epsilon = 1E-12);

        // the second atom crosses the cell boundary
        assert_abs_diff_eq!(images[2].pos_frac[1][0], 1.0, epsilon = 1E-12);
        assert_abs_diff_eq!(images[4].pos_frac[1][0], 1.1, epsilon = 1E-12);
        assert!(images.iter().all(|p| p.comment.contains("is")));
    }

    #[test]
    fn test_incompatible_structures() {
        let is = cubic("is", vec![[0.1, 0.1, 0.1]]);
        let fs = cubic("fs", vec![[0.1, 0.1, 0.1], [0.2, 0.2, 0.2]]);
        assert!(linear_images(&is, &fs, 3, true).is_err());

        let mut fs = cubic("fs", vec![[0.1, 0.1, 0.1]]);
        fs.ion_types = vec!["He".to_string()];
        assert!(check_compatible(&is, &fs).is_err());
    }

    #[test]
    fn test_distances() {
        let pos = cubic("x", vec![[0.02, 0.5, 0.5], [0.98, 0.5, 0.5], [0.5, 0.5, 0.5]]);
        let (d, i, j) = min_interatomic_distance(&pos).unwrap().unwrap();
        assert_abs_diff_eq!(d, 0.4, epsilon = 1E-10);
        assert_eq!((i, j), (1, 2));

        let single = cubic("x", vec![[0.0, 0.0, 0.0]]);
        assert!(min_interatomic_distance(&single).unwrap().is_none());

        let is = cubic("is", vec![[0.1, 0.1, 0.1], [0.5, 0.5, 0.5]]);
        let fs = cubic("fs", vec![[0.1, 0.1, 0.1], [0.5, 0.8, 0.5]]);
        let images = linear_images(&is, &fs, 1, true).unwrap();
        let (dmax, iatom) = max_displacement(&images).unwrap();
        assert_abs_diff_eq!(dmax, 3.0, epsilon = 1E-10);
        assert_eq!(iatom, 2);
    }
}
