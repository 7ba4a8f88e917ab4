use std::path::Path;

use anyhow::Context;
use csv::{
    ReaderBuilder,
    Trim,
};
use indexmap::IndexMap;
use log::debug;

use crate::{
    types::Result,
    commands::common::{
        read_text_file,
        is_hex_color,
    },
    ped::error::PedError,
};


/// One-letter colors accepted in the first column of an energy row.
pub const COLOR_SHORTHANDS: &[(&str, &str)] = &[
    ("r", "#FF0000"),
    ("y", "#FFFF00"),
    ("b", "#0000FF"),
    ("g", "#00FF00"),
    ("k", "#000000"),
];


pub fn default_color_shorthands() -> IndexMap<String, String> {
    COLOR_SHORTHANDS.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}


/// Expand a color shorthand, unknown colors are passed through untouched.
pub fn expand_color(color: &str, shorthands: &IndexMap<String, String>) -> String {
    shorthands.get(color)
        .cloned()
        .unwrap_or_else(|| color.to_string())
}


#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Position along the reaction coordinate, starts from 0.
    pub index: usize,
    pub energy: f64,
    pub tag: String,
}


impl Step {
    /// A step is a transition state if its tag contains "ts" in any case.
    pub fn is_transition_state(&self) -> bool {
        self.tag.to_ascii_lowercase().contains("ts")
    }
}


/// An ordered list of steps sharing one legend and one color.
#[derive(Debug, Clone, PartialEq)]
pub struct Pathway {
    pub legend: String,
    pub color: String,
    pub steps: Vec<Step>,
}


impl Pathway {
    pub fn new(legend: String, color: String, energies: Vec<f64>, tags: Vec<String>) -> std::result::Result<Self, PedError> {
        if energies.len() != tags.len() {
            return Err(PedError::LengthMismatch {
                legend,
                nenergy: energies.len(),
                ntag: tags.len(),
            });
        }

        if energies.is_empty() {
            return Err(PedError::EmptyPathway { legend });
        }

        let steps = energies.into_iter()
            .zip(tags)
            .enumerate()
            .map(|(index, (energy, tag))| Step { index, energy, tag })
            .collect();

        Ok(Self { legend, color, steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn energies(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.energy).collect()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tag.as_str()).collect()
    }

    /// Read all pathways in a table file, gzipped files are accepted.
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized), shorthands: &IndexMap<String, String>) -> Result<Vec<Self>> {
        let content = read_text_file(path)?;
        let ret = parse_table_with_colors(&content, shorthands)
            .with_context(|| format!("Parse PED table {:?} failed.", path.as_ref()))?;
        debug!("{} pathway(s) loaded from {:?}", ret.len(), path.as_ref());
        Ok(ret)
    }
}


/// Parse a PED table with the builtin color shorthands.
pub fn parse_table(content: &str) -> std::result::Result<Vec<Pathway>, PedError> {
    parse_table_with_colors(content, &default_color_shorthands())
}


/// Parse a PED table.
///
/// Rows come in pairs: `color, E0, E1, ...` followed by `legend, tag0, tag1, ...`.
/// Blank lines are ignored, so are lines starting with '#' unless the first cell is
/// a hex color like `#FF0000`. Trailing empty cells of an
/// energy row are dropped, and so are the tag cells beyond the last energy if they
/// are empty.
pub fn parse_table_with_colors(content: &str, shorthands: &IndexMap<String, String>) -> std::result::Result<Vec<Pathway>, PedError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut rows: Vec<(usize, Vec<String>)> = vec![];
    for record in reader.records() {
        let record = record.map_err(|e| PedError::Malformed(e.to_string()))?;
        let line = record.position()
            .map(|p| p.line() as usize)
            .unwrap_or(rows.len() + 1);
        let cells = record.iter()
            .map(str::to_string)
            .collect::<Vec<String>>();

        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        if cells[0].starts_with('#') && !is_hex_color(&cells[0]) {
            debug!("Skipping comment at line {}", line);
            continue;
        }
        rows.push((line, cells));
    }

    if rows.len() % 2 != 0 {
        let (row, _) = rows.last().cloned().unwrap_or_default();
        return Err(PedError::UnpairedRow { row });
    }

    let pathways = rows.chunks(2)
        .map(|pair| {
            let (eline, erow) = &pair[0];
            let (_, trow) = &pair[1];

            let mut erow = erow.clone();
            while erow.len() > 1 && erow.last().map_or(false, |c| c.is_empty()) {
                erow.pop();
            }

            let nenergy = erow.len() - 1;
            let mut trow = trow.clone();
            while trow.len() > nenergy + 1 && trow.last().map_or(false, |c| c.is_empty()) {
                trow.pop();
            }

            let color = expand_color(&erow[0], shorthands);
            let legend = trow[0].clone();

            let energies = erow[1..].iter()
                .enumerate()
                .map(|(i, v)| {
                    v.parse::<f64>()
                        .map_err(|_| PedError::InvalidEnergy {
                            row: *eline,
                            column: i + 2,
                            value: v.clone(),
                        })
                })
                .collect::<std::result::Result<Vec<f64>, PedError>>()?;
            let tags = trow[1..].to_vec();

            Pathway::new(legend, color, energies, tags)
        })
        .collect::<std::result::Result<Vec<Pathway>, PedError>>()?;

    if pathways.is_empty() {
        return Err(PedError::NoPathway);
    }

    Ok(pathways)
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::ped::error::ErrorKind;

    const SAMPLE: &str = "\
r,0.00,0.85,-0.32,0.41,-1.20
path1,IS,TS1,IM,ts2,FS
b,0.00,-0.15,-0.60
path2,IS,IM,FS
";

    #[test]
    fn test_parse_table() {
        let paths = parse_table(SAMPLE).unwrap();
        assert_eq!(paths.len(), 2);

        assert_eq!(paths[0].legend, "path1");
        assert_eq!(paths[0].color, "#FF0000");
        assert_eq!(paths[0].energies(), vec![0.00, 0.85, -0.32, 0.41, -1.20]);
        assert_eq!(paths[0].tags(), vec!["IS", "TS1", "IM", "ts2", "FS"]);
        assert_eq!(paths[0].steps.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);

        assert_eq!(paths[1].legend, "path2");
        assert_eq!(paths[1].color, "#0000FF");
        assert_eq!(paths[1].len(), 3);
    }

    #[test]
    fn test_transition_state_tag() {
        let paths = parse_table(SAMPLE).unwrap();
        let flags = paths[0].steps.iter()
            .map(Step::is_transition_state)
            .collect::<Vec<_>>();
        assert_eq!(flags, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_comments_blank_lines_and_padding() {
        let input = "\
# generated from the spreadsheet
purple, 0.0, 1.0, 0.5,,

path A, IS, , FS,,
";
        let paths = parse_table(input).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].color, "purple");
        assert_eq!(paths[0].legend, "path A");
        assert_eq!(paths[0].tags(), vec!["IS", "", "FS"]);
    }

    #[test]
    fn test_hex_color_is_not_a_comment() {
        let paths = parse_table("#FF0000,0,0.8,-0.5\npath,IS,TS,FS\n").unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].color, "#FF0000");
        assert_eq!(paths[0].legend, "path");
        assert_eq!(paths[0].energies(), vec![0.0, 0.8, -0.5]);

        let input = "\
#00ff00, 0.0, 0.8, -0.5
A, IS, TS, FS
# second pathway, drawn in orange
#FFA500, 0.0, 1.1, -0.2
B, IS, TS, FS
";
        let paths = parse_table(input).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].color, "#00ff00");
        assert_eq!(paths[1].color, "#FFA500");
        assert_eq!(paths[1].legend, "B");
        assert_eq!(paths[1].tags(), vec!["IS", "TS", "FS"]);
    }

    #[test]
    fn test_custom_shorthands() {
        let mut colors = default_color_shorthands();
        colors.insert("o".to_string(), "#FFA500".to_string());
        let paths = parse_table_with_colors("o,1,2\np,a,b\n", &colors).unwrap();
        assert_eq!(paths[0].color, "#FFA500");
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_table("r,0,1,2\npath,IS,FS\n").unwrap_err();
        assert!(matches!(err, PedError::LengthMismatch { nenergy: 3, ntag: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::Structural);

        let err = parse_table("r,0,1\npath,IS,FS\nb,0,1\n").unwrap_err();
        assert!(matches!(err, PedError::UnpairedRow { row: 3 }));

        let err = parse_table("r,0,x1\npath,IS,FS\n").unwrap_err();
        assert!(matches!(err, PedError::InvalidEnergy { row: 1, column: 3, .. }));

        let err = parse_table("r\npath\n").unwrap_err();
        assert!(matches!(err, PedError::EmptyPathway { .. }));

        assert_eq!(parse_table("# nothing\n\n").unwrap_err(), PedError::NoPathway);
    }
}
