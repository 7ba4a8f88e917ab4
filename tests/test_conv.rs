use std::{
    fs,
    io::Write,
    path::PathBuf,
};

use approx::assert_abs_diff_eq;
use flate2::{
    Compression,
    write::GzEncoder,
};
use tempdir::TempDir;
use rspath::{
    Result,
    Outcar,
    Poscar,
    Convergence,
    ConvergenceFormat,
};


macro_rules! get_fpath_in_current_dir {
    ($fname:expr) => {{
        let mut path = PathBuf::from(file!());
        path.pop();
        path.push($fname);
        path
    }}
}


#[test]
fn test_read_outcar() -> Result<()> {
    let outcar = Outcar::from_file(&get_fpath_in_current_dir!("OUTCAR_relax"))?;

    assert_eq!(outcar.nions, 3);
    assert_eq!(outcar.ediffg, Some(-0.02));
    assert_eq!(outcar.ion_types, vec!["Cu", "O"]);
    assert_eq!(outcar.ions_per_type, vec![2, 1]);
    assert_eq!(outcar.ion_iters.len(), 2);
    assert_eq!(outcar.ion_iters.iter().map(|x| x.nscf).collect::<Vec<_>>(), vec![14, 9]);
    assert_eq!(outcar.ion_iters.iter().map(|x| x.toten).collect::<Vec<_>>(), vec![-10.04, -10.19]);
    assert_eq!(outcar.ion_iters.iter().map(|x| x.toten_z).collect::<Vec<_>>(), vec![-10.05, -10.20]);
    assert_eq!(outcar.ion_iters[1].positions[2], [1.25, 1.25, 1.95]);
    Ok(())
}


#[test]
fn test_read_gzipped_outcar() -> Result<()> {
    let fname = get_fpath_in_current_dir!("OUTCAR_relax");
    let dir = TempDir::new("rspath_conv")?;
    let gz = dir.path().join("OUTCAR.gz");

    let mut enc = GzEncoder::new(fs::File::create(&gz)?, Compression::default());
    enc.write_all(fs::read_to_string(&fname)?.as_bytes())?;
    enc.finish()?;

    let plain = Outcar::from_file(&fname)?;
    let zipped = Outcar::from_file(&gz)?;
    assert_eq!(plain, zipped);
    Ok(())
}


#[test]
fn test_convergence_with_constraints() -> Result<()> {
    let outcar = Outcar::from_file(&get_fpath_in_current_dir!("OUTCAR_relax"))?;
    let poscar = Poscar::from_file(&get_fpath_in_current_dir!("POSCAR_relax"))?;
    let conv = Convergence::from_outcar(&outcar, poscar.symbols(), poscar.constraints.clone())?;

    assert_eq!(conv.nfix, 1);
    for (f, r) in conv.steps[0].total_forces.iter().zip([0.0, 0.1, 0.0]) {
        assert_abs_diff_eq!(*f, r, epsilon = 1E-12);
    }
    assert_eq!(conv.steps[0].fmax_index, 2);
    assert_abs_diff_eq!(conv.steps[0].favg, 0.05, epsilon = 1E-12);
    assert_abs_diff_eq!(conv.last().fmax, 0.01, epsilon = 1E-12);
    assert_abs_diff_eq!(conv.energy_changes()[1], -0.15, epsilon = 1E-9);
    assert_eq!(conv.is_converged(), Some(true));
    assert!(conv.summary().contains("1 of 3 atoms were fixed"));

    colored::control::set_override(false);
    let table = ConvergenceFormat::from_convergence(&conv, 0).to_string();
    assert_eq!(table.lines().count(), 3);
    let table = ConvergenceFormat::from_convergence(&conv, 1).to_string();
    assert_eq!(table.lines().count(), 2);
    let table = ConvergenceFormat::from_convergence(&conv, 1)
        .print_toten(true)
        .to_string();
    assert!(table.lines().next().unwrap().contains("TOTEN(eV)"));
    assert!(table.lines().nth(1).unwrap().contains("-10.190000"));
    assert_eq!(conv.steps.iter().map(|s| s.toten).collect::<Vec<_>>(), vec![-10.04, -10.19]);

    let dir = TempDir::new("rspath_conv")?;
    let log = dir.path().join("check_conv.log");
    conv.save_log(&log, &outcar)?;
    let txt = fs::read_to_string(&log)?;
    assert!(txt.contains("   1  Cu    F  F  F"));
    assert!(txt.contains("   3   O    T  T  F"));
    assert!(txt.contains("Step 2: max force 0.010000 at atom 2"));
    assert!(txt.contains("Free energy TOTEN: -10.19 eV."));
    Ok(())
}


#[test]
fn test_without_constraints() -> Result<()> {
    let outcar = Outcar::from_file(&get_fpath_in_current_dir!("OUTCAR_relax"))?;
    let conv = Convergence::from_outcar(&outcar, outcar.symbols(), None)?;

    assert_eq!(conv.nfix, 0);
    assert_abs_diff_eq!(conv.steps[0].fmax, 0.5, epsilon = 1E-12);
    assert_eq!(conv.steps[0].fmax_index, 1);
    assert_abs_diff_eq!(conv.last().fmax, 0.012, epsilon = 1E-12);
    assert_eq!(conv.last().fmax_index, 3);
    Ok(())
}
