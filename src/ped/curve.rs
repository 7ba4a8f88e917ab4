use std::{
    fmt,
    str::FromStr,
};

use clap::ValueEnum;
use serde::{
    Serialize,
    Deserialize,
};

use crate::{
    types::{
        Point,
        Series,
    },
    ped::{
        error::PedError,
        table::{
            Pathway,
            Step,
        },
    },
};


/// How two consecutive steps are joined in the line series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConnectMode {
    /// Straight connectors between bar centers, cubic ones around transition states.
    Cubic,

    /// Flat bars only, one bar per step.
    #[value(alias = "straight")]
    #[serde(alias = "straight")]
    Line,
}


impl Default for ConnectMode {
    fn default() -> Self {
        Self::Cubic
    }
}


impl FromStr for ConnectMode {
    type Err = PedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_ref() {
            "cubic"             => Ok(Self::Cubic),
            "line" | "straight" => Ok(Self::Line),
            _ => Err(PedError::UnknownConnectMode(s.to_string())),
        }
    }
}


impl fmt::Display for ConnectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cubic => write!(f, "cubic"),
            Self::Line  => write!(f, "line"),
        }
    }
}


/// Horizontal geometry of the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Width of the flat bar drawn for each step.
    pub bar_width: f64,
    /// Gap between two neighbouring bars.
    pub spacing: f64,
    /// Number of samples on each cubic connector, both ends included.
    pub nbins: usize,
}


impl Default for Layout {
    fn default() -> Self {
        Self {
            bar_width: 2.0,
            spacing: 4.0,
            nbins: 400,
        }
    }
}


impl Layout {
    pub fn pitch(&self) -> f64 {
        self.bar_width + self.spacing
    }

    pub fn bar_left(&self, index: usize) -> f64 {
        index as f64 * self.pitch()
    }

    pub fn bar_right(&self, index: usize) -> f64 {
        self.bar_left(index) + self.bar_width
    }

    pub fn bar_center(&self, index: usize) -> f64 {
        self.bar_left(index) + self.bar_width / 2.0
    }
}


/// f(x) = a*t^3 + b*t^2 + c*t + d, t = x - origin
///
/// f(x0) = y0, f(x1) = y1, f'(x0) = f'(x1) = 0. The 4x4 system is solved with `x0` as the
/// origin, which is the same cubic as in absolute coordinates but keeps the matrix well
/// conditioned far from x = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub coeffs: [f64; 4],
    pub origin: f64,
    pub x0: f64,
    pub x1: f64,
}


impl CubicSegment {
    pub fn solve(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, PedError> {
        let h = x1 - x0;
        if !h.is_finite() || h == 0.0 {
            return Err(PedError::DegenerateSegment { x0, x1 });
        }

        let mat = [
            [h.powi(3),       h.powi(2), h,   1.0],
            [0.0,             0.0,       0.0, 1.0],
            [3.0 * h.powi(2), 2.0 * h,   1.0, 0.0],
            [0.0,             0.0,       1.0, 0.0],
        ];
        let rhs = [y1, y0, 0.0, 0.0];

        let coeffs = solve4(mat, rhs)
            .ok_or(PedError::DegenerateSegment { x0, x1 })?;

        Ok(Self { coeffs, origin: x0, x0, x1 })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = x - self.origin;
        let [a, b, c, d] = self.coeffs;
        ((a * t + b) * t + c) * t + d
    }

    /// First derivative.
    pub fn slope(&self, x: f64) -> f64 {
        let t = x - self.origin;
        let [a, b, c, _] = self.coeffs;
        (3.0 * a * t + 2.0 * b) * t + c
    }

    /// Evenly spaced samples from x0 to x1, both included.
    pub fn sample(&self, nbins: usize) -> Result<Series, PedError> {
        if nbins < 2 {
            return Err(PedError::TooFewSamples(nbins));
        }

        let dx = (self.x1 - self.x0) / (nbins - 1) as f64;
        let ret = (0 .. nbins)
            .map(|i| {
                let x = if i + 1 == nbins { self.x1 } else { self.x0 + dx * i as f64 };
                [x, self.eval(x)]
            })
            .collect();
        Ok(ret)
    }
}


/// Gaussian elimination with partial pivoting.
fn solve4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    const N: usize = 4;
    let scale = a.iter()
        .flatten()
        .fold(0.0f64, |acc, x| acc.max(x.abs()));
    let tol = f64::EPSILON * scale * N as f64;

    for col in 0 .. N {
        let pivot = (col .. N)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= tol {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1 .. N {
            let factor = a[row][col] / a[col][col];
            for k in col .. N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0 .. N).rev() {
        let sum = (row + 1 .. N).map(|k| a[row][k] * x[k]).sum::<f64>();
        x[row] = (b[row] - sum) / a[row][row];
    }
    Some(x)
}


/// Sampled cubic with zero slope at both ends, passing through (x0, y0) and (x1, y1).
pub fn cubic_fit(x0: f64, y0: f64, x1: f64, y1: f64, nbins: usize) -> Result<Series, PedError> {
    CubicSegment::solve(x0, y0, x1, y1)?.sample(nbins)
}


/// Points of one pathway, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSeries {
    /// One point per step at the bar center.
    pub scatter: Series,
    /// Bars or connectors, depending on the connect mode.
    pub line: Series,
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveBuilder {
    layout: Layout,
    mode: ConnectMode,
}


impl CurveBuilder {
    pub fn new(layout: Layout, mode: ConnectMode) -> Result<Self, PedError> {
        if mode == ConnectMode::Cubic && layout.nbins < 2 {
            return Err(PedError::TooFewSamples(layout.nbins));
        }
        Ok(Self { layout, mode })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn mode(&self) -> ConnectMode {
        self.mode
    }

    pub fn build(&self, pathway: &Pathway) -> Result<CurveSeries, PedError> {
        self.build_steps(&pathway.legend, &pathway.steps)
    }

    pub fn build_steps(&self, legend: &str, steps: &[Step]) -> Result<CurveSeries, PedError> {
        if let Some(last) = steps.last() {
            if last.is_transition_state() {
                return Err(PedError::TerminalTransitionState {
                    legend: legend.to_string(),
                    tag: last.tag.clone(),
                });
            }
        }

        let scatter = steps.iter()
            .enumerate()
            .map(|(i, s)| [self.layout.bar_center(i), s.energy])
            .collect::<Series>();

        let line = match self.mode {
            ConnectMode::Line => {
                steps.iter()
                    .enumerate()
                    .flat_map(|(i, s)| [
                        [self.layout.bar_left(i),  s.energy],
                        [self.layout.bar_right(i), s.energy],
                    ])
                    .collect::<Series>()
            },

            ConnectMode::Cubic => {
                let mut line: Series = vec![];
                for (i, pair) in steps.windows(2).enumerate() {
                    let p0: Point = scatter[i];
                    let p1: Point = scatter[i + 1];
                    if pair[0].is_transition_state() || pair[1].is_transition_state() {
                        line.extend(cubic_fit(p0[0], p0[1], p1[0], p1[1], self.layout.nbins)?);
                    } else {
                        line.push(p0);
                        line.push(p1);
                    }
                }
                line
            },
        };

        Ok(CurveSeries { scatter, line })
    }
}
