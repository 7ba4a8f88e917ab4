use std::{
    fs,
    io::{
        BufWriter,
        Write,
    },
    path::Path,
};

use crate::{
    types::Result,
    vasp_parsers::poscar::Poscar,
};


/// One extended XYZ frame: lattice in the comment line, cartesian positions in A.
pub fn write_xyz_frame<W: Write>(mut w: W, pos: &Poscar) -> Result<()> {
    let lattice = pos.cell.iter()
        .flat_map(|v| v.iter())
        .map(|x| format!("{:.8}", x))
        .collect::<Vec<String>>()
        .join(" ");

    writeln!(w, "{}", pos.nions())?;
    writeln!(w, "Lattice=\"{}\" Properties=species:S:1:pos:R:3 pbc=\"T T T\"", lattice)?;
    for (sym, p) in pos.symbols().iter().zip(pos.pos_cart.iter()) {
        writeln!(w, "{:<4}{:16.8}{:16.8}{:16.8}", sym, p[0], p[1], p[2])?;
    }
    Ok(())
}


/// All images as consecutive frames of a single trajectory file.
pub fn save_xyz_movie(file_name: &(impl AsRef<Path> + ?Sized), images: &[Poscar]) -> Result<()> {
    let f = fs::File::create(file_name)?;
    let mut w = BufWriter::new(f);
    for img in images {
        write_xyz_frame(&mut w, img)?;
    }
    w.flush()?;
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_xyz_frame() {
        let pos = Poscar::from_frac(
            "H2O".to_string(),
            [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
            vec!["O".to_string(), "H".to_string()],
            vec![1, 2],
            vec![[0.5, 0.5, 0.5], [0.6, 0.5, 0.5], [0.5, 0.6, 0.5]],
            None,
        );

        let mut buf = Vec::<u8>::new();
        write_xyz_frame(&mut buf, &pos).unwrap();
        write_xyz_frame(&mut buf, &pos).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        let lines = txt.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "3");
        assert!(lines[1].starts_with("Lattice=\"10.00000000 0.00000000 0.00000000 0.00000000 10.00000000"));
        assert_eq!(lines[3].split_whitespace().collect::<Vec<_>>(),
                   vec!["H", "6.00000000", "5.00000000", "5.00000000"]);
        assert_eq!(lines[5], "3");
    }
}
