use std::{
    fs,
    path::PathBuf,
};

use clap::{
    Args,
    ValueEnum,
};
use colored::Colorize;
use log::{
    info,
    warn,
    debug,
};
use ndarray::Array1;
use plotly::{
    Plot,
    Scatter,
    common::{
        Mode,
        Title,
        DashType,
        Line,
    },
};

use crate::{
    types::Result,
    OptProcess,
    Outcar,
    Poscar,
    conv::{
        Convergence,
        Criterion,
    },
    format::ConvergenceFormat,
    settings::Settings,
    commands::common::write_array_to_txt,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YVariable {
    /// Maximum force on the atoms.
    #[value(name = "f", alias = "force")]
    Force,
    /// Energy(sigma->0).
    #[value(name = "e", alias = "energy")]
    Energy,
}


#[derive(Debug, Args)]
/// Check the convergence of a relaxation.
///
/// Forces on the fixed directions are masked out with the selective dynamics flags read
/// from POSCAR, the averaged force only counts atoms which are not fixed in all directions.
/// The stopping criterion is taken from EDIFFG in OUTCAR.
pub struct Conv {
    #[arg(default_value = "./OUTCAR")]
    /// Specify the input OUTCAR file, gzipped file is also accepted.
    outcar: PathBuf,

    #[arg(short = 'p', long, default_value = "./POSCAR")]
    /// Specify the input POSCAR file for the constraints.
    poscar: PathBuf,

    #[arg(short = 'y', long, value_enum, default_value = "f", ignore_case = true)]
    /// Quantity to be plotted, maximum force or energy.
    y_variable: YVariable,

    #[arg(short = 'n', long, default_value_t = 0)]
    /// Only print and plot the last N ionic steps, 0 for all.
    last_n: usize,

    #[arg(short = 'e', long)]
    /// Also print the free energy TOTEN of each step.
    toten: bool,

    #[arg(short = 'l', long)]
    /// Also write the positions and forces of each step to the log file.
    log: bool,

    #[arg(short, long)]
    /// Extra config file in TOML format, overrides `rspath.toml` and the user config.
    config: Option<PathBuf>,

    #[arg(short = 'o', long)]
    /// Write the plot to html and view it in the web browser. [default: conv.html]
    htmlout: Option<PathBuf>,

    #[arg(long)]
    /// Write the raw plot data as txt file. [default: conv.txt]
    txtout: Option<PathBuf>,

    #[arg(long)]
    /// Open default browser to see the plot immediately.
    show: bool,

    #[arg(long)]
    /// Render the plot and print the rendered code to stdout.
    to_inline_html: bool,
}


impl OptProcess for Conv {
    fn process(&self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref())?.conv;
        let htmlout = self.htmlout.clone().unwrap_or(settings.htmlout);
        let txtout = self.txtout.clone().unwrap_or(settings.txtout);

        info!("Parsing file {:?} and {:?}", &self.outcar, &self.poscar);
        debug!("    OUTCAR file path = {:?}\n    POSCAR file path = {:?}",
               fs::canonicalize(&self.outcar), fs::canonicalize(&self.poscar));

        let outcar = Outcar::from_file(&self.outcar)?;
        let constraints = match Poscar::from_file(&self.poscar) {
            Ok(poscar) => {
                if poscar.constraints.is_none() {
                    info!("No selective dynamics in {:?}, all atoms are free.", &self.poscar);
                }
                poscar.constraints
            },
            Err(e) => {
                warn!("Reading constraints from POSCAR file {:?} failed: {}", &self.poscar, e);
                None
            },
        };

        let conv = Convergence::from_outcar(&outcar, outcar.symbols(), constraints)?;

        let table = ConvergenceFormat::from_convergence(&conv, self.last_n)
            .print_toten(self.toten);
        print!("{}", table);
        println!("{}", conv.summary());

        match (conv.criterion, conv.is_converged()) {
            (Some(Criterion::Force(f)), Some(true)) =>
                println!("{}", format!("Converged: max force is below |EDIFFG| = {} eV/A.", f).bright_green()),
            (Some(Criterion::Force(f)), Some(false)) =>
                println!("{}", format!("Not converged: max force is above |EDIFFG| = {} eV/A.", f).bright_red()),
            (Some(Criterion::Energy(e)), Some(true)) =>
                println!("{}", format!("Converged: energy change is below EDIFFG = {} eV.", e).bright_green()),
            (Some(Criterion::Energy(e)), Some(false)) =>
                println!("{}", format!("Not converged: energy change is above EDIFFG = {} eV.", e).bright_red()),
            _ => warn!("EDIFFG not found in {:?}, convergence is not judged.", &self.outcar),
        }

        let tail = conv.tail(self.last_n);
        let steps = tail.iter().map(|s| s.step as f64).collect::<Array1<f64>>();
        let energy = tail.iter().map(|s| s.energy).collect::<Array1<f64>>();
        let fmax = tail.iter().map(|s| s.fmax).collect::<Array1<f64>>();
        let favg = tail.iter().map(|s| s.favg).collect::<Array1<f64>>();

        info!("Writing raw plot data to {:?}", &txtout);
        write_array_to_txt(&txtout, vec![&steps, &energy, &fmax, &favg],
                           "Step  E0(eV)  Fmax(eV/A)  Favg(eV/A)")?;

        let (ydat, ylabel) = match self.y_variable {
            YVariable::Force  => (fmax, "Max force (eV/A)"),
            YVariable::Energy => (energy, "Energy (eV)"),
        };

        let mut plot = Plot::new();
        plot.add_trace(Scatter::new(steps.to_vec(), ydat.to_vec())
                       .mode(Mode::LinesMarkers)
                       .name(ylabel));

        if let (YVariable::Force, Some(Criterion::Force(f))) = (self.y_variable, conv.criterion) {
            let n = steps.len();
            if n > 0 {
                let x = vec![steps[0], steps[n - 1]];
                plot.add_trace(Scatter::new(x, vec![f, f])
                               .mode(Mode::Lines)
                               .name("|EDIFFG|")
                               .line(Line::new().dash(DashType::Dash)));
            }
        }

        plot.use_local_plotly();
        let layout = plotly::Layout::new()
            .title(Title::with_text("Relaxation convergence"))
            .y_axis(plotly::layout::Axis::new()
                    .title(Title::with_text(ylabel)))
            .x_axis(plotly::layout::Axis::new()
                    .title(Title::with_text("Ionic step")));
        plot.set_layout(layout);

        info!("Writing to {:?}", &htmlout);
        plot.write_html(&htmlout);

        if self.log {
            info!("Writing per-atom log to {:?}", &settings.logout);
            conv.save_log(&settings.logout, &outcar)?;
        }

        if self.show {
            plot.show();
        }

        if self.to_inline_html {
            info!("Printing inline html to stdout ...");
            println!("{}", plot.to_inline_html(None));
        }

        Ok(())
    }
}
