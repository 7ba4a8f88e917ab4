use std::{
    fs,
    io::Write,
    path::Path,
};

use itertools::{
    EitherOrBoth,
    Itertools,
};

use crate::{
    types::Result,
    ped::{
        curve::CurveSeries,
        table::Pathway,
    },
};


/// Write the line and scatter series of each pathway side by side as a comma separated table.
///
/// Every block starts with `#<legend> <color>`, followed by the axis names and the data
/// rows, and is terminated by a line of 50 '#'. The shorter of the two series is padded
/// with empty cells.
pub fn write_ped_data<W: Write>(
    mut w: W,
    pathways: &[Pathway],
    series: &[CurveSeries],
    xlabel: &str,
    ylabel: &str,
) -> Result<()> {
    for (path, s) in pathways.iter().zip(series.iter()) {
        writeln!(w, "#{} {}", path.legend, path.color)?;
        writeln!(w, "{},{},{},{},Tag name", xlabel, ylabel, xlabel, ylabel)?;

        let scatter = s.scatter.iter().zip(path.steps.iter());
        for row in s.line.iter().zip_longest(scatter) {
            let line = match row {
                EitherOrBoth::Both(l, (p, step)) => {
                    format!("{},{},{},{},{}", l[0], l[1], p[0], p[1], step.tag)
                },
                EitherOrBoth::Left(l) => {
                    format!("{},{},,,", l[0], l[1])
                },
                EitherOrBoth::Right((p, step)) => {
                    format!(",,{},{},{}", p[0], p[1], step.tag)
                },
            };
            writeln!(w, "{}", line)?;
        }

        writeln!(w, "{}", "#".repeat(50))?;
    }

    Ok(())
}


pub fn save_ped_data(
    file_name: &(impl AsRef<Path> + ?Sized),
    pathways: &[Pathway],
    series: &[CurveSeries],
    xlabel: &str,
    ylabel: &str,
) -> Result<()> {
    let f = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(file_name)?;
    write_ped_data(std::io::BufWriter::new(f), pathways, series, xlabel, ylabel)
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::ped::{
        curve::{
            CurveBuilder,
            ConnectMode,
            Layout,
        },
        table::parse_table,
    };

    #[test]
    fn test_write_ped_data() {
        let paths = parse_table("k,0,-0.5,0.25\nA,IS,IM,FS\n").unwrap();
        let builder = CurveBuilder::new(Layout::default(), ConnectMode::Line).unwrap();
        let series = paths.iter()
            .map(|p| builder.build(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        let mut buf = Vec::<u8>::new();
        write_ped_data(&mut buf, &paths, &series, "Reaction coordinate", "Free Energy (eV)").unwrap();
        let output = String::from_utf8(buf).unwrap();

        let expected = "\
#A #000000
Reaction coordinate,Free Energy (eV),Reaction coordinate,Free Energy (eV),Tag name
0,0,1,0,IS
2,0,7,-0.5,IM
6,-0.5,13,0.25,FS
8,-0.5,,,
12,0.25,,,
14,0.25,,,
##################################################
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_scatter_longer_than_line() {
        let paths = parse_table("k,0,-0.5\nA,IS,FS\n").unwrap();
        let series = vec![CurveSeries {
            scatter: vec![[1.0, 0.0], [7.0, -0.5]],
            line: vec![],
        }];

        let mut buf = Vec::<u8>::new();
        write_ped_data(&mut buf, &paths, &series, "x", "y").unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains("\n,,1,0,IS\n,,7,-0.5,FS\n"));
    }
}
