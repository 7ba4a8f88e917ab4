use std::path::Path;

use anyhow::{
    Context,
    bail,
    ensure,
};
use log::{
    debug,
    warn,
};
use regex::Regex;

use crate::{
    types::{
        Result,
        MatX3,
    },
    commands::common::read_text_file,
};


#[derive(Clone, Debug, PartialEq)]
pub struct IonicStep {
    pub nscf      : i32,
    pub toten     : f64,
    pub toten_z   : f64,
    pub positions : MatX3<f64>,
    pub forces    : MatX3<f64>,
}


#[derive(Clone, Debug, PartialEq)]
pub struct Outcar {
    pub nions         : usize,
    /// Ionic stopping criterion, `None` if not found.
    pub ediffg        : Option<f64>,
    pub ion_types     : Vec<String>,
    pub ions_per_type : Vec<i32>,
    pub ion_iters     : Vec<IonicStep>,
}


impl Outcar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let context = read_text_file(path)?;
        Self::from_str(&context)
            .with_context(|| format!("Parse OUTCAR file {:?} failed.", path.as_ref()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(context: &str) -> Result<Self> {
        let nions         = Self::parse_nions(context)?;
        let ediffg        = Self::parse_ediffg(context)?;
        let ion_types     = Self::parse_ion_types(context)?;
        let ions_per_type = Self::parse_ions_per_type(context)?;

        ensure!(ions_per_type.iter().sum::<i32>() as usize == nions,
            "Ions per type {:?} don't sum up to NIONS = {}", ions_per_type, nions);

        let (positions, forces) = Self::parse_posforce(context)?;
        let totens  = Self::parse_toten(context)?;
        let totenzs = Self::parse_toten_z(context)?;
        let nscfs   = Self::parse_nscfs(context)?;

        let len = [positions.len(), totens.len(), totenzs.len(), nscfs.len()]
            .into_iter()
            .min()
            .unwrap_or(0);
        if positions.len() != len || totenzs.len() != len {
            warn!("Incomplete ionic step found, OUTCAR may be truncated. Only {} complete ionic step(s) are kept.", len);
        }
        debug!("{} ionic step(s) parsed, NIONS = {}", len, nions);

        let ion_iters = positions.into_iter()
            .zip(forces)
            .zip(totens)
            .zip(totenzs)
            .zip(nscfs)
            .map(|((((positions, forces), toten), toten_z), nscf)| IonicStep {
                nscf,
                toten,
                toten_z,
                positions,
                forces,
            })
            .collect::<Vec<IonicStep>>();

        for (i, it) in ion_iters.iter().enumerate() {
            ensure!(it.forces.len() == nions,
                "Ionic step {} has {} force entries but NIONS = {}", i + 1, it.forces.len(), nions);
        }

        Ok(Self {
            nions,
            ediffg,
            ion_types,
            ions_per_type,
            ion_iters,
        })
    }

    /// Element symbol of each atom.
    pub fn symbols(&self) -> Vec<String> {
        self.ion_types.iter()
            .zip(self.ions_per_type.iter())
            .flat_map(|(t, &n)| std::iter::repeat(t.clone()).take(n as usize))
            .collect()
    }

    fn parse_nions(context: &str) -> Result<usize> {
        Regex::new(r"NIONS = \s+(\d+)")?
            .captures(context)
            .context("NIONS not found in OUTCAR")?
            .get(1)
            .context("NIONS not found in OUTCAR")?
            .as_str()
            .parse::<usize>()
            .context("Invalid NIONS")
    }

    fn parse_ediffg(context: &str) -> Result<Option<f64>> {
        Regex::new(r"EDIFFG = \s*(\S+)")?
            .captures(context)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().parse::<f64>().context("Invalid EDIFFG"))
            .transpose()
    }

    fn parse_toten(context: &str) -> Result<Vec<f64>> {
        Regex::new(r"free  energy   TOTEN  = \s*(\S+) eV")?
            .captures_iter(context)
            .map(|x| {
                x[1].parse::<f64>()
                    .with_context(|| format!("Invalid TOTEN {:?}", &x[1]))
            })
            .collect()
    }

    fn parse_toten_z(context: &str) -> Result<Vec<f64>> {
        Regex::new(r"energy  without entropy=\s+(\S+)\s+energy\(sigma->0\) =\s+(\S+)")?
            .captures_iter(context)
            .map(|x| {
                x[2].parse::<f64>()
                    .with_context(|| format!("Invalid energy(sigma->0) {:?}", &x[2]))
            })
            .collect()
    }

    fn parse_posforce(context: &str) -> Result<(Vec<MatX3<f64>>, Vec<MatX3<f64>>)> {
        let mut positions = vec![];
        let mut forces = vec![];
        for m in Regex::new(r"(?m)^ POSITION")?.find_iter(context) {
            let (p, f) = Self::_parse_posforce_single_iteration(&context[m.start()..])?;
            positions.push(p);
            forces.push(f);
        }
        Ok((positions, forces))
    }

    fn _parse_posforce_single_iteration(context: &str) -> Result<(MatX3<f64>, MatX3<f64>)> {
        ensure!(context.starts_with(" POSITION"), "Not a POSITION block.");
        let mut positions = vec![];
        let mut forces = vec![];

        for line in context.lines()
            .skip(2)
            .take_while(|x| !x.starts_with(" ----")) {
            let v = line.split_whitespace()
                .map(|x| x.parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .with_context(|| format!("Invalid position/force line {:?}", line))?;
            if v.len() != 6 {
                bail!("Six columns are expected in position/force line {:?}", line);
            }
            positions.push([v[0], v[1], v[2]]);
            forces.push([v[3], v[4], v[5]]);
        }

        Ok((positions, forces))
    }

    fn parse_ions_per_type(context: &str) -> Result<Vec<i32>> {
        Regex::new(r"(?m)ions per type = .*$")?
            .find(context)
            .context("'ions per type' not found in OUTCAR")?
            .as_str()
            .split_whitespace()
            .skip(4)
            .map(|x| x.parse::<i32>().context("Invalid ions per type"))
            .collect()
    }

    fn parse_ion_types(context: &str) -> Result<Vec<String>> {
        let mut v = Regex::new(r"(?m)^ POTCAR:.*$")?
            .find_iter(context)
            .map(|l| {
                l.as_str()
                    .split_whitespace()
                    .nth(2)
                    .map(|s| s.split('_').next().unwrap_or(s).to_string())
                    .context("Invalid POTCAR line")
            })
            .collect::<Result<Vec<String>>>()?;

        let len = v.len() / 2;
        v.truncate(v.len() - len);
        Ok(v)
    }

    fn parse_nscfs(context: &str) -> Result<Vec<i32>> {
        Regex::new(r"free  energy")?  // navigate to tail of ionic step
            .find_iter(context)
            .map(|x| Self::_parse_nscf(&context[..x.start()]))
            .collect()
    }

    fn _parse_nscf(context: &str) -> Result<i32> {
        let pos = context
            .rmatch_indices("Iteration") // get the last "Iteration" during ionic step
            .next()
            .context("No SCF iteration found before the ionic step")?
            .0;
        let context = &context[pos..];
        Regex::new(r"Iteration\s*\d+\(\s*(\d+)\)")?
            .captures(context)
            .context("Invalid SCF iteration line")?[1]
            .parse::<i32>()
            .context("Invalid SCF iteration number")
    }
}
