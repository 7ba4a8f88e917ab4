use std::sync::OnceLock;
use clap::{
    Parser,
    builder::styling::{
        AnsiColor,
        Effects,
        Styles,
    },
};
use enum_dispatch::enum_dispatch;

use crate::{
    types::Result,
    commands::{
        ped::Ped,
        neb::Neb,
        conv::Conv,
    },
};


pub fn get_style() -> Styles {
    static INSTANCE: OnceLock<Styles> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        Styles::styled()
            .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
            .usage(AnsiColor::Green.on_default()   | Effects::BOLD)
            .literal(AnsiColor::Green.on_default() | Effects::BOLD)
            .placeholder(AnsiColor::BrightBlue.on_default())
            .error(AnsiColor::BrightRed.on_default())
            .valid(AnsiColor::BrightYellow.on_default())
    }).to_owned()
}


#[enum_dispatch]
pub trait OptProcess {
    fn process(&self) -> Result<()>;
}


#[enum_dispatch(OptProcess)]
#[derive(Debug, Parser)]
#[command(name = "rspath",
            about = r"Reaction path helpers for VASP: potential energy diagrams, NEB initial images
and relaxation convergence checks.",
            version,
            author = "KiwiWan",
            styles = get_style()
            )]
enum Opt {
    Ped,

    Neb,

    Conv,
}


pub fn run() -> Result<()> {
    Opt::parse().process()
}


#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Opt::command().debug_assert();

        let opt = Opt::try_parse_from(["rspath", "ped", "input.csv", "--connect", "straight", "--nbins", "50"]).unwrap();
        assert!(matches!(opt, Opt::Ped(_)));

        let opt = Opt::try_parse_from(["rspath", "neb", "-m", "line", "-n", "3", "--no-wrap"]).unwrap();
        assert!(matches!(opt, Opt::Neb(_)));

        let opt = Opt::try_parse_from(["rspath", "conv", "-y", "e", "-n", "5", "-l", "-e"]).unwrap();
        assert!(matches!(opt, Opt::Conv(_)));

        assert!(Opt::try_parse_from(["rspath", "ped", "--connect", "spline"]).is_err());
    }
}
