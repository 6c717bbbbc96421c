use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::error::Error;
use std::path::{Path, PathBuf};

use libfieldcam::aggregator::read_files_with_format;
use libfieldcam::config::Config;
use libfieldcam::container::ContainerFormat;
use libfieldcam::curve::{Curve, CurveOptions};
use libfieldcam::error::ReporterError;
use libfieldcam::kml::write_kml;
use libfieldcam::series::{format_epoch, DatasetName, Subset, TimeSeries};
use libfieldcam::status::{ReadStatus, Reporter};
use libfieldcam::table::read_tables;
use libfieldcam::timelapse::{make_timelapse, TimelapseOptions, DEFAULT_FPS};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Drives an indicatif bar from the per-file read statuses
struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn new(manager: &MultiProgress) -> Self {
        let bar = manager.add(ProgressBar::new(0));
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} files {msg}")
        {
            bar.set_style(style);
        }
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Reporter for ProgressReporter {
    fn report(&self, status: ReadStatus) -> Result<(), ReporterError> {
        self.bar.set_length(status.file_count as u64);
        self.bar.set_position((status.file_index + 1) as u64);
        self.bar.set_message(format!(
            "{} ({} records)",
            status.path.to_string_lossy(),
            status.records
        ));
        Ok(())
    }
}

fn dir_arg() -> Arg {
    Arg::new("dir")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Acquisition directory")
}

fn build_cli() -> Command {
    Command::new("fieldcam_cli")
        .about("Read, merge and prepare field camera data")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a configuration yaml file"),
        )
        .arg(
            Arg::new("filter-kernel")
                .long("filter-kernel")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Median filter kernel (odd)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Output directory"),
        )
        .arg(
            Arg::new("output-name")
                .long("output-name")
                .global(true)
                .help("Output file name"),
        )
        .arg(
            Arg::new("derivative")
                .long("derivative")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write the rate of change per hour instead of the values"),
        )
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(
                    Arg::new("path")
                        .short('p')
                        .long("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the file"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Merge a dataset and summarize it")
                .arg(dir_arg())
                .arg(
                    Arg::new("dataset")
                        .required(true)
                        .help("exposures or measurements"),
                )
                .arg(
                    Arg::new("subset")
                        .help("exposure, temperature or magnetic_field (measurements only)"),
                ),
        )
        .subcommand(
            Command::new("temperature")
                .about("Prepare the temperature curve of one camera")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("temperatures")
                .about("Prepare the temperature curve of every configured camera")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("magnetometry")
                .about("Prepare the magnetic field curves of one camera")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("timelapse")
                .about("Assemble the frames of one exposures file into a timelapse")
                .arg(dir_arg())
                .arg(
                    Arg::new("name")
                        .required(true)
                        .help("Exposures file inside the directory"),
                )
                .arg(
                    Arg::new("fps")
                        .long("fps")
                        .value_parser(value_parser!(u32))
                        .default_value("24")
                        .help("Frame rate"),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .value_parser(value_parser!(u32))
                        .help("Resize frames to this height"),
                ),
        )
        .subcommand(
            Command::new("kml")
                .about("Convert a camera deployment table to KML")
                .arg(
                    Arg::new("csv")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Camera table"),
                ),
        )
}

/// Load the config (or defaults) and apply the command line overrides
fn load_config(matches: &ArgMatches) -> CliResult<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Loading config from {}...", path.to_string_lossy());
            Config::read_config_file(path)?
        }
        None => Config::default(),
    };
    if let Some(kernel) = matches.get_one::<usize>("filter-kernel") {
        config.filter_kernel = *kernel;
    }
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        config.output_path = output.clone();
    }
    config.validate()?;
    Ok(config)
}

fn output_name(matches: &ArgMatches, default: &str) -> String {
    matches
        .get_one::<String>("output-name")
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn curve_label(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.to_string_lossy().to_string())
}

fn load_measurements(
    dir: &Path,
    subset: Subset,
    config: &Config,
    reporter: &ProgressReporter,
) -> CliResult<TimeSeries> {
    let series = match config.format {
        ContainerFormat::Hdf5 => read_files_with_format(
            dir,
            DatasetName::Measurements,
            Some(subset),
            ContainerFormat::Hdf5,
            reporter,
        )?,
        ContainerFormat::Text => {
            let table = read_tables(dir)?;
            match subset {
                Subset::MagneticField => table.magnetic_series()?,
                _ => table.temperature_series()?,
            }
        }
    };
    reporter.finish();
    Ok(series)
}

fn write_curve(curve: &Curve, config: &Config, name: &str) -> CliResult<()> {
    let path = config.get_output_file(name)?;
    curve.write(&path)?;
    log::info!(
        "Wrote {} points of {} to {}",
        curve.len(),
        curve.label,
        path.to_string_lossy()
    );
    Ok(())
}

fn inspect(matches: &ArgMatches, config: &Config, manager: &MultiProgress) -> CliResult<()> {
    let dir = matches
        .get_one::<PathBuf>("dir")
        .ok_or("A directory is required")?;
    let dataset: DatasetName = matches
        .get_one::<String>("dataset")
        .ok_or("A dataset is required")?
        .parse()?;
    let subset = match matches.get_one::<String>("subset") {
        Some(s) => Some(s.parse::<Subset>()?),
        None => None,
    };

    let reporter = ProgressReporter::new(manager);
    let series = read_files_with_format(dir, dataset, subset, config.format, &reporter)?;
    reporter.finish();

    log::info!("{} records of {}", series.len(), series.values().kind_name());
    if let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) {
        log::info!("First: {}", format_epoch(first));
        log::info!("Last: {}", format_epoch(last));
    }
    Ok(())
}

fn temperature(
    dir: &Path,
    label: &str,
    options: &CurveOptions,
    config: &Config,
    manager: &MultiProgress,
) -> CliResult<Curve> {
    let reporter = ProgressReporter::new(manager);
    let series = load_measurements(dir, Subset::Temperature, config, &reporter)?;
    Ok(Curve::temperature(&series, label, options)?)
}

fn run(matches: &ArgMatches, manager: &MultiProgress) -> CliResult<()> {
    if let Some(("new", sub)) = matches.subcommand() {
        let path = sub
            .get_one::<PathBuf>("path")
            .ok_or("A path is required")?;
        log::info!("Making a template config at {}...", path.to_string_lossy());
        Config::write_template(path)?;
        log::info!("Done.");
        return Ok(());
    }

    let config = load_config(matches)?;
    let derivative = matches.get_flag("derivative");
    let options = config.curve_options(derivative);
    let suffix = if derivative { "_derivative" } else { "" };

    match matches.subcommand() {
        Some(("inspect", sub)) => inspect(sub, &config, manager)?,
        Some(("temperature", sub)) => {
            let dir = sub.get_one::<PathBuf>("dir").ok_or("A directory is required")?;
            let curve = temperature(dir, &curve_label(dir), &options, &config, manager)?;
            write_curve(
                &curve,
                &config,
                &output_name(matches, &format!("temperature{suffix}.txt")),
            )?;
        }
        Some(("temperatures", sub)) => {
            let dir = sub.get_one::<PathBuf>("dir").ok_or("A directory is required")?;
            let name = output_name(matches, &format!("temperatures{suffix}.txt"));
            let mut written = 0;
            for camera in config.cameras.iter() {
                let camera_dir = match config.get_camera_directory(dir, camera) {
                    Ok(d) => d,
                    Err(e) => {
                        log::warn!("Skipping camera {camera}: {e}");
                        continue;
                    }
                };
                let curve = temperature(&camera_dir, camera, &options, &config, manager)?;
                write_curve(&curve, &config, &format!("{camera}_{name}"))?;
                written += 1;
            }
            if written == 0 {
                return Err(format!("No camera directories found in {}", dir.to_string_lossy()).into());
            }
        }
        Some(("magnetometry", sub)) => {
            let dir = sub.get_one::<PathBuf>("dir").ok_or("A directory is required")?;
            let reporter = ProgressReporter::new(manager);
            let series = load_measurements(dir, Subset::MagneticField, &config, &reporter)?;
            let curve = Curve::magnetic(&series, &curve_label(dir), &options)?;
            write_curve(
                &curve,
                &config,
                &output_name(matches, &format!("magnetometry{suffix}.txt")),
            )?;
        }
        Some(("timelapse", sub)) => {
            let dir = sub.get_one::<PathBuf>("dir").ok_or("A directory is required")?;
            let name = sub
                .get_one::<String>("name")
                .ok_or("An exposures file is required")?;
            let options = TimelapseOptions {
                fps: sub.get_one::<u32>("fps").copied().unwrap_or(DEFAULT_FPS),
                height: sub.get_one::<u32>("height").copied(),
            };
            let reporter = ProgressReporter::new(manager);
            make_timelapse(dir, name, &config.output_path, &options, &reporter)?;
            reporter.finish();
        }
        Some(("kml", sub)) => {
            let csv = sub.get_one::<PathBuf>("csv").ok_or("A camera table is required")?;
            let output = match matches.get_one::<String>("output-name") {
                Some(name) => Some(config.get_output_file(name)?),
                None => None,
            };
            write_kml(csv, output.as_deref())?;
        }
        _ => return Err("Unknown command".into()),
    }
    log::info!("Done.");
    Ok(())
}

fn main() {
    let matches = build_cli().get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(&matches, &pb_manager) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let matches = build_cli()
            .try_get_matches_from([
                "fieldcam_cli",
                "inspect",
                "/data/camel",
                "measurements",
                "temperature",
                "--filter-kernel",
                "5",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.filter_kernel, 5);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "inspect");
        assert_eq!(sub.get_one::<String>("subset").unwrap(), "temperature");
    }

    #[test]
    fn test_cli_rejects_missing_dir() {
        assert!(build_cli()
            .try_get_matches_from(["fieldcam_cli", "temperature"])
            .is_err());
    }

    #[test]
    fn test_timelapse_defaults() {
        let matches = build_cli()
            .try_get_matches_from(["fieldcam_cli", "timelapse", "/data/camel", "13_exposures.hdf5"])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(*sub.get_one::<u32>("fps").unwrap(), 24);
        assert!(sub.get_one::<u32>("height").is_none());
        assert!(build_cli()
            .try_get_matches_from(["fieldcam_cli", "timelapse", "/data/camel"])
            .is_err());
    }

    #[test]
    fn test_even_kernel_rejected() {
        let matches = build_cli()
            .try_get_matches_from(["fieldcam_cli", "temperature", "/d", "--filter-kernel", "4"])
            .unwrap();
        assert!(load_config(&matches).is_err());
    }
}
