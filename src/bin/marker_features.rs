use clap::{Parser, Subcommand};
use glam::DVec3;
use marker_features::config::{Delimiter, DescriberType, ImportConfig, Verbosity};
use marker_features::gcp::{format_markers_arg, load_coordinates, select_markers};
use marker_features::io::{object_from_json, write_import_report};
use marker_features::observer::LogObserver;
use marker_features::pipeline::{ImportPaths, run};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct MfrsCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a marker table into cctag features, descriptors and matches
    Import {
        /// Scene description file with the list of views
        #[arg(long)]
        views: PathBuf,

        /// Marker table: x, y, imageFileName, markerId, size
        #[arg(long)]
        markers: PathBuf,

        /// Output folder for *.feat and *.desc
        #[arg(short, long)]
        output: PathBuf,

        /// Output folder for 0.matches.txt, defaults to --output
        #[arg(long)]
        matches_output: Option<PathBuf>,

        /// JSON configuration, overridden by the flags below
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the 128-byte descriptor block and write 0.matches.txt directly
        #[arg(long)]
        bypass_limit: bool,

        #[arg(long, value_enum)]
        describer_type: Option<DescriberType>,

        #[arg(long, value_enum)]
        delimiter: Option<Delimiter>,

        #[arg(long, value_enum)]
        verbosity: Option<Verbosity>,

        /// Write views in parallel
        #[arg(long)]
        parallel: bool,

        /// Write a JSON summary of the run
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the --markers argument for marker based alignment
    Gcp {
        /// Marker coordinates: markerId, easting, northing, elevation
        #[arg(long)]
        coordinates: PathBuf,

        /// Comma separated marker ids
        #[arg(long)]
        markers: String,

        #[arg(long, value_enum, default_value = "semicolon")]
        delimiter: Delimiter,

        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        offset_x: f64,

        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        offset_y: f64,

        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        offset_z: f64,

        /// Decimal places of each coordinate
        #[arg(long, default_value = "3")]
        precision: usize,

        #[arg(long, value_enum, default_value = "info")]
        verbosity: Verbosity,
    },
}

fn init_logger(verbosity: Verbosity) {
    env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .parse_default_env()
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = MfrsCli::parse();

    match cli.command {
        Commands::Import {
            views,
            markers,
            output,
            matches_output,
            config,
            bypass_limit,
            describer_type,
            delimiter,
            verbosity,
            parallel,
            report,
        } => {
            let mut import_config: ImportConfig = match &config {
                Some(path) => object_from_json(path)?,
                None => ImportConfig::default(),
            };
            import_config.bypass_limit |= bypass_limit;
            import_config.parallel |= parallel;
            if let Some(d) = describer_type {
                import_config.describer_type = d;
            }
            if let Some(d) = delimiter {
                import_config.delimiter = d;
            }
            if let Some(v) = verbosity {
                import_config.verbosity = v;
            }
            init_logger(import_config.verbosity);
            log::debug!("{:?}", import_config);

            let mut paths = ImportPaths::new(views, markers, output);
            if let Some(dir) = matches_output {
                paths.matches_dir = dir;
            }

            let now = Instant::now();
            let observer = LogObserver::new();
            let summary = run(&paths, &import_config, &observer)?;
            log::info!(
                "imported {} views in {:.3} sec",
                summary.views,
                now.elapsed().as_secs_f64()
            );
            if let Some(report_path) = report {
                write_import_report(&report_path, &summary)?;
                log::info!("report written to {}", report_path.display());
            }
        }
        Commands::Gcp {
            coordinates,
            markers,
            delimiter,
            offset_x,
            offset_y,
            offset_z,
            precision,
            verbosity,
        } => {
            init_logger(verbosity);
            let coords = load_coordinates(
                &coordinates,
                delimiter,
                DVec3::new(offset_x, offset_y, offset_z),
            )?;
            let selected = select_markers(&markers, &coords)?;
            println!("{}", format_markers_arg(&selected, precision).trim_start());
        }
    }

    Ok(())
}
