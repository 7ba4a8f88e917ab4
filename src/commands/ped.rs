use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use log::{
    info,
    debug,
};
use plotly::{
    Plot,
    Scatter,
    common::{
        Line,
        Marker,
        MarkerSymbol,
        Mode,
        Title,
    },
};

use crate::{
    types::Result,
    OptProcess,
    settings::{
        Settings,
        PedSettings,
    },
    ped::{
        ConnectMode,
        CurveBuilder,
        CurveSeries,
        Pathway,
        save_ped_data,
    },
    commands::common::parse_color,
};


#[derive(Debug, Args)]
/// Draw the potential energy diagram of one or more reaction pathways.
///
/// The input table holds two rows per pathway: the first one starts with the color (r, y,
/// b, g, k, a named color or a hex code) followed by the energy of each step, the second
/// one starts with the legend followed by the tag of each step. Lines starting with '#'
/// are comments unless the first cell is a hex color. Steps tagged with "TS" are drawn as
/// transition states with smooth cubic connectors.
///
/// Settings not given on the command line are read from `rspath.toml` or the user config.
pub struct Ped {
    #[arg(default_value = "./ped.csv")]
    /// Input table, comma separated. Gzipped file is also accepted.
    input: PathBuf,

    #[arg(long, value_enum, ignore_case = true)]
    /// How consecutive steps are connected, cubic connectors are only drawn around transition states.
    connect: Option<ConnectMode>,

    #[arg(long)]
    /// Number of points sampled on each cubic connector.
    nbins: Option<usize>,

    #[arg(long)]
    /// Width of the bar of each step.
    bar_width: Option<f64>,

    #[arg(long)]
    /// Horizontal gap between two bars.
    spacing: Option<f64>,

    #[arg(long)]
    /// Label of the x axis.
    xlabel: Option<String>,

    #[arg(long)]
    /// Label of the y axis.
    ylabel: Option<String>,

    #[arg(short, long)]
    /// Extra config file in TOML format, overrides `rspath.toml` and the user config.
    config: Option<PathBuf>,

    #[arg(long, default_value = "PED.data")]
    /// Write the plot data as text in order to replot it with other tools.
    dataout: PathBuf,

    #[arg(short = 'o', long, default_value = "PED.html")]
    /// Write the plot to html and view it in the web browser.
    htmlout: PathBuf,

    #[arg(long)]
    /// Open default browser to see the plot immediately.
    show: bool,

    #[arg(long)]
    /// Render the plot and print the rendered code to stdout.
    to_inline_html: bool,
}


impl Ped {
    fn merged_settings(&self) -> Result<PedSettings> {
        let mut ped = Settings::load(self.config.as_deref())?.ped;

        if let Some(connect) = self.connect     { ped.connect = connect; }
        if let Some(nbins) = self.nbins         { ped.nbins = nbins; }
        if let Some(w) = self.bar_width         { ped.bar_width = w; }
        if let Some(s) = self.spacing           { ped.spacing = s; }
        if let Some(x) = self.xlabel.as_ref()   { ped.xlabel = x.clone(); }
        if let Some(y) = self.ylabel.as_ref()   { ped.ylabel = y.clone(); }

        debug!("PED settings: {:?}", &ped);
        Ok(ped)
    }
}


/// Line trace and the marker trace of each pathway.
pub fn plot_pathways(pathways: &[Pathway], series: &[CurveSeries], xlabel: &str, ylabel: &str) -> Plot {
    let mut plot = Plot::new();

    for (path, s) in pathways.iter().zip(series.iter()) {
        let (x, y): (Vec<f64>, Vec<f64>) = s.line.iter().map(|p| (p[0], p[1])).unzip();
        let trace = Scatter::new(x, y)
            .mode(Mode::Lines)
            .name(&path.legend)
            .legend_group(&path.legend)
            .line(Line::new().color(path.color.clone()).width(2.0));
        plot.add_trace(trace);

        let (x, y): (Vec<f64>, Vec<f64>) = s.scatter.iter().map(|p| (p[0], p[1])).unzip();
        let text = path.steps.iter()
            .map(|st| format!("{}: {:.3}", st.tag, st.energy))
            .collect::<Vec<String>>();
        let trace = Scatter::new(x, y)
            .mode(Mode::Markers)
            .name(&path.legend)
            .legend_group(&path.legend)
            .show_legend(false)
            .text_array(text)
            .marker(Marker::new()
                    .symbol(MarkerSymbol::LineEWOpen)
                    .size(20)
                    .color(path.color.clone()));
        plot.add_trace(trace);
    }

    let layout = plotly::Layout::new()
        .title(Title::with_text("Potential Energy Diagram"))
        .y_axis(plotly::layout::Axis::new()
                .title(Title::with_text(ylabel))
                .zero_line(true))
        .x_axis(plotly::layout::Axis::new()
                .title(Title::with_text(xlabel))
                .show_tick_labels(false));
    plot.set_layout(layout);
    plot
}


impl OptProcess for Ped {
    fn process(&self) -> Result<()> {
        let settings = self.merged_settings()?;

        info!("Reading PED table from {:?}", &self.input);
        let mut pathways = Pathway::from_file(&self.input, &settings.colors)?;
        for path in pathways.iter_mut() {
            path.color = parse_color(&path.color)
                .with_context(|| format!("Invalid color for pathway {:?}", path.legend))?;
        }

        let builder = CurveBuilder::new(settings.layout(), settings.connect)?;
        let series = pathways.iter()
            .map(|p| builder.build(p))
            .collect::<std::result::Result<Vec<CurveSeries>, _>>()?;
        info!("{} pathway(s) built in {} mode.", series.len(), settings.connect);

        info!("Writing plot data to {:?}", &self.dataout);
        save_ped_data(&self.dataout, &pathways, &series, &settings.xlabel, &settings.ylabel)?;

        let mut plot = plot_pathways(&pathways, &series, &settings.xlabel, &settings.ylabel);
        plot.use_local_plotly();

        info!("Writing to {:?}", &self.htmlout);
        plot.write_html(&self.htmlout);

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
