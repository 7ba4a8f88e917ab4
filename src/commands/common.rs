use std::{
    io::{
        Read,
        Write,
    },
    fs,
    path::Path,
};

use anyhow::{
    bail,
    Result,
    Context,
};
use flate2::read::GzDecoder;
use log::debug;
use ndarray::Array1;


const NAMED_COLORS: &[&str] = &[
        "aliceblue",            "antiquewhite",     "aqua",             "aquamarine",       "azure",
        "beige",                "bisque",           "black",            "blanchedalmond",   "blue",
        "blueviolet",           "brown",            "burlywood",        "cadetblue",        "chartreuse",
        "chocolate",            "coral",            "cornflowerblue",   "cornsilk",         "crimson",
        "cyan",                 "darkblue",         "darkcyan",         "darkgoldenrod",    "darkgray",
        "darkgrey",             "darkgreen",        "darkkhaki",        "darkmagenta",      "darkolivegreen",
        "darkorange",           "darkorchid",       "darkred",          "darksalmon",       "darkseagreen",
        "darkslateblue",        "darkslategray",    "darkslategrey",    "darkturquoise",    "darkviolet",
        "deeppink",             "deepskyblue",      "dimgray",          "dimgrey",          "dodgerblue",
        "firebrick",            "floralwhite",      "forestgreen",      "fuchsia",          "gainsboro",
        "ghostwhite",           "gold",             "goldenrod",        "gray",             "grey",
        "green",                "greenyellow",      "honeydew",         "hotpink",          "indianred",
        "indigo",               "ivory",            "khaki",            "lavender",         "lavenderblush",
        "lawngreen",            "lemonchiffon",     "lightblue",        "lightcoral",       "lightcyan",
        "lightgoldenrodyellow", "lightgray",        "lightgrey",        "lightgreen",       "lightpink",
        "lightsalmon",          "lightseagreen",    "lightskyblue",     "lightslategray",   "lightslategrey",
        "lightsteelblue",       "lightyellow",      "lime",             "limegreen",        "linen",
        "magenta",              "maroon",           "mediumaquamarine", "mediumblue",       "mediumorchid",
        "mediumpurple",         "mediumseagreen",   "mediumslateblue",  "mediumspringgreen","mediumturquoise",
        "mediumvioletred",      "midnightblue",     "mintcream",        "mistyrose",        "moccasin",
        "navajowhite",          "navy",             "oldlace",          "olive",            "olivedrab",
        "orange",               "orangered",        "orchid",           "palegoldenrod",    "palegreen",
        "paleturquoise",        "palevioletred",    "papayawhip",       "peachpuff",        "peru",
        "pink",                 "plum",             "powderblue",       "purple",           "red",
        "rosybrown",            "royalblue",        "saddlebrown",      "salmon",           "sandybrown",
        "seagreen",             "seashell",         "sienna",           "silver",           "skyblue",
        "slateblue",            "slategray",        "slategrey",        "snow",             "springgreen",
        "steelblue",            "tan",              "teal",             "thistle",          "tomato",
        "turquoise",            "violet",           "wheat",            "white",            "whitesmoke",
        "yellow",               "yellowgreen",      "transparent",
    ];


/// Read a whole text file, `*.gz` files are decompressed on the fly.
pub fn read_text_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<String> {
    let path = path.as_ref();
    let raw = fs::read(path)
        .with_context(|| format!("Cannot read file {:?}", path))?;

    let mut content = String::new();
    if path.extension().map_or(false, |ext| ext == "gz") {
        debug!("Decompressing {:?}", path);
        GzDecoder::new(&raw[..]).read_to_string(&mut content)
            .with_context(|| format!("Cannot decompress file {:?}", path))?;
    } else {
        content = String::from_utf8(raw)
            .with_context(|| format!("File {:?} is not valid UTF-8 text", path))?;
    }

    Ok(content)
}


pub fn write_array_to_txt(file_name: &(impl AsRef<Path> + ?Sized), ys: Vec<&Array1<f64>>, comment: &str) -> Result<()> {
    let ncol = ys.len();

    let x = ys.get(0).context("At lease one data set is needed")?;
    let nrow = x.len();

    if nrow == 0 || !ys.iter().all(|y| y.len() == nrow) {
        bail!("[WRT_ARRAY]: input data with zero length or they don't have consistent lengths");
    }

    let mut f = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(file_name)?;

    writeln!(f, "# {}", comment.trim())?;

    for irow in 0 .. nrow {
        let mut s = String::with_capacity(8);
        for icol in 0 .. ncol {
            s.push_str(&format!("  {:15.6}", ys[icol][irow]));
        }
        s.push('\n');

        f.write_all(s.as_bytes())?;
    }
    
    Ok(())
}


/// `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
pub fn is_hex_color(input: &str) -> bool {
    match input.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}


/// Check the color for plotting, either a CSS named color or a hex code like `#F00` or `#FF0000`.
pub fn parse_color(input: &str) -> Result<String> {
    let input = input.trim();
    if NAMED_COLORS.contains(&input.to_ascii_lowercase().as_ref()) {
        return Ok(input.to_ascii_lowercase());
    }

    if is_hex_color(input) {
        Ok(input.to_ascii_uppercase())
    } else {
        bail!("The input color {:?} is neither a named color nor a valid hex code. 
See \"https://developer.mozilla.org/en-US/docs/Web/CSS/color_value for availed named colors.\"", input);
    }
}
