use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod literal;
mod model;
mod pipeline;
mod reader;
mod render;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "simlog-plot")]
#[command(about = "Plot scheduler simulation results and power traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct RecordArgs {
    /// Record logs, e.g. `find -name slr_plot_data | xargs simlog-plot slr`.
    files: Vec<String>,

    /// Save charts as <OUT>-<figure>.<format> instead of showing them.
    #[arg(short = 'o', long)]
    out: Option<String>,

    /// JSON plot configuration.
    #[arg(short = 'c', long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scatter of SLR against DAG size, one chart per application and one
    /// series per power dip fraction.
    Slr {
        #[command(flatten)]
        args: RecordArgs,
    },

    /// Ratio of mean makespans of two algorithms against DAG size.
    Ratio {
        #[command(flatten)]
        args: RecordArgs,

        /// Algorithm on top of the ratio (exact name, or a unique substring).
        #[arg(long)]
        numerator: Option<String>,

        /// Algorithm below the ratio (exact name, or a unique substring).
        #[arg(long)]
        denominator: Option<String>,
    },

    /// Step plot of every trace in one power log.
    Power {
        /// Lines of ('label', initial_value, {time: value, ...}).
        file: String,

        /// Save the chart to this file; format from its extension.
        #[arg(short = 'o', long)]
        out: Option<String>,

        /// JSON plot configuration.
        #[arg(short = 'c', long)]
        config: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Slr { args } => {
            // 1) Config first, so a bad option fails before any input is read.
            let config = config::RawConfig::load(args.config.as_deref())?.validate_and_build()?;

            // 2) Parse logs.
            let records = reader::read_record_files(&args.files)?;
            log::info!("read {} record(s) from {} file(s)", records.len(), args.files.len());

            // 3) Group + aggregate, then render.
            let charts = pipeline::metric_charts(&records, &config)?;
            let output = record_output(args.out);
            pipeline::emit(&charts, &config.chart, &output)?;
        }
        Commands::Ratio {
            args,
            numerator,
            denominator,
        } => {
            let mut raw = config::RawConfig::load(args.config.as_deref())?;
            if numerator.is_some() {
                raw.ratio.numerator = numerator;
            }
            if denominator.is_some() {
                raw.ratio.denominator = denominator;
            }
            let config = raw.validate_and_build()?;

            let records = reader::read_record_files(&args.files)?;
            log::info!("read {} record(s) from {} file(s)", records.len(), args.files.len());

            let (charts, skipped) = pipeline::ratio_charts(&records, &config)?;
            if !skipped.is_empty() {
                log::warn!("{} comparison(s) skipped", skipped.len());
            }
            let output = record_output(args.out);
            pipeline::emit(&charts, &config.chart, &output)?;
        }
        Commands::Power { file, out, config } => {
            let config = config::RawConfig::load(config.as_deref())?.validate_and_build()?;

            let traces = reader::read_power_file(&file)?;
            let chart = pipeline::power_chart(&traces, &file, &config.chart);

            let output = match out {
                Some(path) => render::Output::File(PathBuf::from(path)),
                None => render::Output::Show,
            };
            pipeline::emit(&[chart], &config.chart, &output)?;
        }
    }

    Ok(())
}

fn record_output(out: Option<String>) -> render::Output {
    match out {
        Some(prefix) => render::Output::Prefix(prefix),
        None => render::Output::Show,
    }
}
