use std::{
    fs,
    path::PathBuf,
};

use approx::assert_abs_diff_eq;
use tempdir::TempDir;
use rspath::{
    Result,
    ped::{
        Pathway,
        CurveBuilder,
        ConnectMode,
        Layout,
        PedError,
        ErrorKind,
        default_color_shorthands,
        save_ped_data,
    },
    commands::ped::plot_pathways,
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
fn test_read_table() -> Result<()> {
    let paths = Pathway::from_file(&get_fpath_in_current_dir!("ped.csv"), &default_color_shorthands())?;

    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].legend, "COOH path");
    assert_eq!(paths[0].color, "#FF0000");
    assert_eq!(paths[0].energies(), vec![0.00, 0.85, -0.32, 0.41, -1.20]);
    assert_eq!(paths[1].legend, "OCHO path");
    assert_eq!(paths[1].color, "#0000FF");
    assert_eq!(paths[1].tags(), vec!["IS", "IM", "FS"]);
    Ok(())
}


#[test]
fn test_build_both_modes() -> Result<()> {
    let paths = Pathway::from_file(&get_fpath_in_current_dir!("ped.csv"), &default_color_shorthands())?;
    let layout = Layout::default();
    let cubic = CurveBuilder::new(layout, ConnectMode::Cubic)?;
    let line = CurveBuilder::new(layout, ConnectMode::Line)?;

    let c = cubic.build(&paths[0])?;
    let l = line.build(&paths[0])?;
    assert_eq!(c.scatter, l.scatter);
    assert_eq!(l.line.len(), 10);

    // every connector of the first pathway touches a transition state
    assert_eq!(c.line.len(), 4 * layout.nbins);
    assert_abs_diff_eq!(c.line[0][0], 1.0, epsilon = 1E-9);
    assert_abs_diff_eq!(c.line[0][1], 0.0, epsilon = 1E-9);
    assert_abs_diff_eq!(c.line[layout.nbins - 1][0], 7.0, epsilon = 1E-9);
    assert_abs_diff_eq!(c.line[layout.nbins - 1][1], 0.85, epsilon = 1E-9);

    // no transition state, straight connectors between bar centers
    let c = cubic.build(&paths[1])?;
    assert_eq!(c.line, vec![[1.0, 0.0], [7.0, -0.15], [7.0, -0.15], [13.0, -0.6]]);
    Ok(())
}


#[test]
fn test_terminal_transition_state() -> Result<()> {
    let paths = Pathway::from_file(&get_fpath_in_current_dir!("ped_terminal_ts.csv"), &default_color_shorthands())?;

    for mode in [ConnectMode::Cubic, ConnectMode::Line] {
        let err = CurveBuilder::new(Layout::default(), mode)?
            .build(&paths[0])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert!(matches!(err, PedError::TerminalTransitionState { .. }));
    }
    Ok(())
}


#[test]
fn test_write_outputs() -> Result<()> {
    let paths = Pathway::from_file(&get_fpath_in_current_dir!("ped.csv"), &default_color_shorthands())?;
    let builder = CurveBuilder::new(Layout::default(), ConnectMode::Cubic)?;
    let series = paths.iter()
        .map(|p| builder.build(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let dir = TempDir::new("rspath_ped")?;
    let data = dir.path().join("PED.data");
    save_ped_data(&data, &paths, &series, "Reaction coordinate", "Free Energy (eV)")?;

    let txt = fs::read_to_string(&data)?;
    assert!(txt.starts_with("#COOH path #FF0000\n"));
    assert!(txt.contains("\n#OCHO path #0000FF\n"));
    assert_eq!(txt.matches("#".repeat(50).as_str()).count(), 2);

    let html = dir.path().join("PED.html");
    let plot = plot_pathways(&paths, &series, "Reaction coordinate", "Free Energy (eV)");
    plot.write_html(&html);
    assert!(html.is_file());
    Ok(())
}
