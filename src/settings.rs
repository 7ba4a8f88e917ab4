use std::path::{
    Path,
    PathBuf,
};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{
        Format,
        Serialized,
        Toml,
    },
};
use indexmap::IndexMap;
use log::{
    debug,
    info,
};
use serde::{
    Serialize,
    Deserialize,
};

use crate::{
    types::Result,
    ped::{
        ConnectMode,
        Layout,
        default_color_shorthands,
    },
    neb::InterpolationMethod,
};


pub const LOCAL_CONFIG_FILE: &str = "rspath.toml";


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedSettings {
    pub bar_width: f64,
    pub spacing: f64,
    pub nbins: usize,
    pub connect: ConnectMode,
    pub xlabel: String,
    pub ylabel: String,
    /// Extra or overridden color shorthands, e.g. `o = "#FFA500"`.
    pub colors: IndexMap<String, String>,
}


impl Default for PedSettings {
    fn default() -> Self {
        let layout = Layout::default();
        Self {
            bar_width: layout.bar_width,
            spacing: layout.spacing,
            nbins: layout.nbins,
            connect: ConnectMode::default(),
            xlabel: "Reaction coordinate".to_string(),
            ylabel: "Free Energy (eV)".to_string(),
            colors: default_color_shorthands(),
        }
    }
}


impl PedSettings {
    pub fn layout(&self) -> Layout {
        Layout {
            bar_width: self.bar_width,
            spacing: self.spacing,
            nbins: self.nbins,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NebSettings {
    pub method: InterpolationMethod,
    pub nimages: usize,
    /// Warn if two atoms in one image come closer than this, in Angstrom.
    pub min_dist: f64,
    pub idpp_fmax: f64,
    pub idpp_steps: usize,
    pub idpp_spring: f64,
}


impl Default for NebSettings {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::Idpp,
            nimages: 5,
            min_dist: 0.8,
            idpp_fmax: 0.1,
            idpp_steps: 100,
            idpp_spring: 0.1,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvSettings {
    pub htmlout: PathBuf,
    pub txtout: PathBuf,
    pub logout: PathBuf,
}


impl Default for ConvSettings {
    fn default() -> Self {
        Self {
            htmlout: PathBuf::from("conv.html"),
            txtout: PathBuf::from("conv.txt"),
            logout: PathBuf::from("check_conv.log"),
        }
    }
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ped: PedSettings,
    pub neb: NebSettings,
    pub conv: ConvSettings,
}


impl Settings {
    /// The user wide config file, `~/.config/rspath/config.toml` on Linux.
    pub fn user_config_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rspath")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Builtin defaults, overridden by the user config, then by `./rspath.toml`, then by
    /// `extra` if given. Missing optional files are skipped, an explicit `extra` must exist.
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(user) = Self::user_config_file() {
            debug!("User config file: {:?}", &user);
            if user.is_file() {
                info!("Reading settings from {:?}", &user);
                figment = figment.merge(Toml::file(user));
            }
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.is_file() {
            info!("Reading settings from {:?}", local);
            figment = figment.merge(Toml::file(local));
        }

        if let Some(extra) = extra {
            anyhow::ensure!(extra.is_file(), "Config file {:?} not found.", extra);
            info!("Reading settings from {:?}", extra);
            figment = figment.merge(Toml::file(extra));
        }

        Ok(figment.extract()?)
    }

    /// Parse settings from a TOML string on top of the builtin defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::string(content))
            .extract()?)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.ped.layout(), Layout::default());
        assert_eq!(settings.ped.colors.get("r").unwrap(), "#FF0000");
        assert_eq!(settings.neb.nimages, 5);
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::from_toml_str(r##"
[ped]
spacing = 3.0
connect = "line"
colors = { o = "#FFA500" }

[neb]
method = "linear"
nimages = 7
"##).unwrap();

        assert_eq!(settings.ped.spacing, 3.0);
        assert_eq!(settings.ped.bar_width, 2.0);
        assert_eq!(settings.ped.connect, ConnectMode::Line);
        assert_eq!(settings.ped.colors.get("o").unwrap(), "#FFA500");
        assert_eq!(settings.ped.colors.get("k").unwrap(), "#000000");
        assert_eq!(settings.neb.method, InterpolationMethod::Linear);
        assert_eq!(settings.neb.nimages, 7);
        assert_eq!(settings.neb.min_dist, 0.8);
    }

    #[test]
    fn test_invalid_value() {
        assert!(Settings::from_toml_str("[ped]\nconnect = \"spline\"\n").is_err());
        assert!(Settings::from_toml_str("[ped]\nnbins = -1\n").is_err());
    }
}
