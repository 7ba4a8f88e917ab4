//! Image dependent pair potential (IDPP) refinement of an interpolated band.
//!
//! Each image gets a target interatomic distance matrix interpolated linearly between the
//! end points. The objective `sum_{i<j} (d_ij - t_ij)^2 / d_ij^4` is minimized with
//! NEB-projected forces and an MDMin optimizer; end points are kept fixed.

use log::{
    debug,
    info,
};
use rayon::prelude::*;

use crate::types::{
    MatX3,
    norm3,
};


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdppParams {
    /// Stop when every per-atom projected force is below this value, eV/A.
    pub fmax: f64,
    pub max_steps: usize,
    /// NEB spring constant between neighbouring images.
    pub spring: f64,
    pub dt: f64,
    /// Largest per-atom displacement in one optimizer step, A.
    pub max_move: f64,
}


impl Default for IdppParams {
    fn default() -> Self {
        Self {
            fmax: 0.1,
            max_steps: 100,
            spring: 0.1,
            dt: 0.2,
            max_move: 0.2,
        }
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdppReport {
    pub nsteps: usize,
    pub fmax: f64,
    pub converged: bool,
}


fn pair_distances(pos: &MatX3<f64>) -> Vec<f64> {
    let n = pos.len();
    let mut ret = vec![0.0; n * n];
    for i in 0 .. n {
        for j in i + 1 .. n {
            let d = norm3(&sub3(&pos[i], &pos[j]));
            ret[i * n + j] = d;
            ret[j * n + i] = d;
        }
    }
    ret
}


fn sub3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}


/// IDPP objective of one image and its gradient as forces.
pub fn idpp_energy_forces(pos: &MatX3<f64>, target: &[f64]) -> (f64, MatX3<f64>) {
    let n = pos.len();
    let mut energy = 0.0;
    let mut forces = vec![[0.0; 3]; n];

    for i in 0 .. n {
        for j in i + 1 .. n {
            let r = sub3(&pos[i], &pos[j]);
            let d = norm3(&r);
            if d < 1E-8 {
                continue;
            }
            let dd = d - target[i * n + j];
            let d4 = d.powi(4);
            energy += dd * dd / d4;

            // dE/dd
            let g = 2.0 * dd / d4 * (1.0 - 2.0 * dd / d);
            for k in 0 .. 3 {
                let c = g * r[k] / d;
                forces[i][k] -= c;
                forces[j][k] += c;
            }
        }
    }

    (energy, forces)
}


fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}


fn flatten(m: &MatX3<f64>) -> Vec<f64> {
    m.iter().flat_map(|v| v.iter().copied()).collect()
}


/// Tangent of image `i` following the energy weighted scheme of Henkelman and Jónsson.
fn tangent(prev: &[f64], cur: &[f64], next: &[f64], e_prev: f64, e: f64, e_next: f64) -> Vec<f64> {
    let tm = cur.iter().zip(prev.iter()).map(|(c, p)| c - p).collect::<Vec<f64>>();
    let tp = next.iter().zip(cur.iter()).map(|(n, c)| n - c).collect::<Vec<f64>>();

    let mut t = if e_next > e && e > e_prev {
        tp
    } else if e_next < e && e < e_prev {
        tm
    } else {
        let dvmax = (e_next - e).abs().max((e_prev - e).abs());
        let dvmin = (e_next - e).abs().min((e_prev - e).abs());
        let (wp, wm) = if e_next > e_prev { (dvmax, dvmin) } else { (dvmin, dvmax) };
        let weighted = tp.iter().zip(tm.iter()).map(|(p, m)| p * wp + m * wm).collect::<Vec<f64>>();
        if dot(&weighted, &weighted) > 1E-20 {
            weighted
        } else {
            tp.iter().zip(tm.iter()).map(|(p, m)| p + m).collect()
        }
    };

    let norm = dot(&t, &t).sqrt();
    if norm > 1E-12 {
        t.iter_mut().for_each(|v| *v /= norm);
    }
    t
}


/// Relax the intermediate images of `band` in place.
///
/// `band` holds cartesian positions of every image including both end points. `free` marks
/// the movable cartesian components, fixed ones never move.
pub fn idpp_relax(band: &mut [MatX3<f64>], free: &MatX3<bool>, params: &IdppParams) -> IdppReport {
    let nimg = band.len();
    if nimg < 3 {
        return IdppReport { nsteps: 0, fmax: 0.0, converged: true };
    }
    let nions = band[0].len();

    let d_init = pair_distances(&band[0]);
    let d_final = pair_distances(&band[nimg - 1]);
    let targets = (0 .. nimg)
        .map(|k| {
            let t = k as f64 / (nimg - 1) as f64;
            d_init.iter().zip(d_final.iter())
                .map(|(a, b)| a + (b - a) * t)
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<Vec<f64>>>();

    let mask = free.iter()
        .flat_map(|c| c.iter().map(|&x| if x { 1.0 } else { 0.0 }))
        .collect::<Vec<f64>>();

    let mut velocity: Option<Vec<f64>> = None;
    let mut last_forces: Vec<f64> = vec![];
    let mut report = IdppReport { nsteps: 0, fmax: f64::INFINITY, converged: false };

    for step in 0 ..= params.max_steps {
        let evaluated = band.par_iter()
            .zip(targets.par_iter())
            .map(|(pos, target)| idpp_energy_forces(pos, target))
            .collect::<Vec<(f64, MatX3<f64>)>>();

        let flat = band.iter().map(flatten).collect::<Vec<Vec<f64>>>();

        // projected forces of intermediate images, concatenated
        let mut forces = Vec::with_capacity((nimg - 2) * nions * 3);
        for i in 1 .. nimg - 1 {
            let t = tangent(&flat[i - 1], &flat[i], &flat[i + 1],
                            evaluated[i - 1].0, evaluated[i].0, evaluated[i + 1].0);
            let raw = flatten(&evaluated[i].1)
                .iter().zip(mask.iter())
                .map(|(f, m)| f * m)
                .collect::<Vec<f64>>();

            let along = dot(&raw, &t);
            let lm = flat[i].iter().zip(flat[i - 1].iter()).map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt();
            let lp = flat[i + 1].iter().zip(flat[i].iter()).map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt();
            let spring = params.spring * (lp - lm);

            forces.extend(raw.iter()
                .zip(t.iter())
                .zip(mask.iter())
                .map(|((f, tv), m)| (f - along * tv + spring * tv) * m));
        }

        let fmax = forces.chunks(3)
            .map(|f| (f[0] * f[0] + f[1] * f[1] + f[2] * f[2]).sqrt())
            .fold(0.0, f64::max);
        debug!("IDPP step {:4}: fmax = {:.5}", step, fmax);

        report.nsteps = step;
        report.fmax = fmax;
        if fmax < params.fmax {
            report.converged = true;
            break;
        }
        if step == params.max_steps {
            break;
        }

        // MDMin: keep only the velocity component along the force, reset when going uphill
        let v = match velocity.take() {
            None => vec![0.0; forces.len()],
            Some(mut v) => {
                v.iter_mut()
                    .zip(forces.iter().zip(last_forces.iter()))
                    .for_each(|(v, (f, fo))| *v += 0.5 * params.dt * (f + fo));
                let vf = dot(&v, &forces);
                let ff = dot(&forces, &forces);
                if vf < 0.0 || ff == 0.0 {
                    v.iter_mut().for_each(|x| *x = 0.0);
                } else {
                    v.iter_mut().zip(forces.iter()).for_each(|(x, f)| *x = f * vf / ff);
                }
                v
            },
        };
        last_forces = forces;

        let mut dpos = v.iter().map(|x| x * params.dt).collect::<Vec<f64>>();
        velocity = Some(v);
        let largest = dpos.chunks(3)
            .map(|d| (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt())
            .fold(0.0, f64::max);
        let scaling = params.max_move / (largest + 1E-7);
        if scaling < 1.0 {
            dpos.iter_mut().for_each(|d| *d *= scaling);
        }

        for (img, chunk) in band[1 .. nimg - 1].iter_mut().zip(dpos.chunks(nions * 3)) {
            for (p, d) in img.iter_mut().zip(chunk.chunks(3)) {
                p[0] += d[0];
                p[1] += d[1];
                p[2] += d[2];
            }
        }
    }

    if report.converged {
        info!("IDPP converged after {} steps, fmax = {:.5} eV/A.", report.nsteps, report.fmax);
    }
    report
}


#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_forces_match_gradient() {
        let pos = vec![[0.0, 0.0, 0.0], [1.1, 0.2, 0.0], [0.3, 1.4, 0.5]];
        let target = pair_distances(&vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.2, 0.0]]);
        let (_, forces) = idpp_energy_forces(&pos, &target);

        let h = 1E-6;
        for i in 0 .. 3 {
            for k in 0 .. 3 {
                let mut p = pos.clone();
                p[i][k] += h;
                let ep = idpp_energy_forces(&p, &target).0;
                p[i][k] -= 2.0 * h;
                let em = idpp_energy_forces(&p, &target).0;
                assert_abs_diff_eq!(forces[i][k], -(ep - em) / (2.0 * h), epsilon = 1E-6);
            }
        }
    }

    #[test]
    fn test_zero_at_target() {
        let pos = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let (e, f) = idpp_energy_forces(&pos, &pair_distances(&pos));
        assert_eq!(e, 0.0);
        assert_eq!(f, vec![[0.0; 3]; 2]);
    }

    #[test]
    fn test_relax_keeps_end_points() {
        // a three-atom rotation, linear interpolation squeezes the moving atom
        let first = vec![[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [3.0, 0.0, 0.0]];
        let last = vec![[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [1.5, 1.5, 0.0]];
        let mut band = (0 ..= 4)
            .map(|k| {
                let t = k as f64 / 4.0;
                first.iter().zip(last.iter())
                    .map(|(a, b)| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, a[2] + (b[2] - a[2]) * t])
                    .collect::<MatX3<f64>>()
            })
            .collect::<Vec<_>>();
        let linear = band.clone();

        let mut free = vec![[true; 3]; 3];
        free[0] = [false; 3];
        let report = idpp_relax(&mut band, &free, &IdppParams::default());

        assert!(report.nsteps > 0);
        assert_eq!(band[0], linear[0]);
        assert_eq!(band[4], linear[4]);
        for img in band.iter() {
            assert_eq!(img[0], [0.0, 0.0, 0.0]);
        }

        // the pulled atom keeps a larger distance from the pivot than on the straight line
        let d_lin = norm3(&sub3(&linear[2][2], &linear[2][1]));
        let d_idpp = norm3(&sub3(&band[2][2], &band[2][1]));
        assert!(d_idpp > d_lin);
    }

    #[test]
    fn test_no_intermediate_image() {
        let mut band = vec![vec![[0.0; 3]], vec![[1.0, 0.0, 0.0]]];
        let report = idpp_relax(&mut band, &vec![[true; 3]], &IdppParams::default());
        assert!(report.converged);
        assert_eq!(report.nsteps, 0);
    }
}
