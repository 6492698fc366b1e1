use clap::Parser;
use log::{error, info, warn};
use seriesdb_core::cli::{Cli, OutputFormat};
use seriesdb_core::{ImageSeriesWriter, ReadReport, SeriesSet, SeriesSetReader, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let options = match cli.read_options() {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    info!("Reading {} input(s)", cli.inputs.len());
    let reader = SeriesSetReader::new(options);
    let (series_set, report) = match reader.read_all(&cli.inputs) {
        Ok(result) => result,
        Err(e) => {
            error!("Read failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Some(folder) = &cli.export {
        export_images(&series_set, folder);
    }

    output_report(&report, &series_set, cli.format);
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn export_images(series_set: &SeriesSet, folder: &std::path::Path) {
    let writer = ImageSeriesWriter::new();
    for image in series_set.iter().filter_map(|s| s.as_image()) {
        let target = folder.join(&image.source.instance_uid);
        if let Err(e) = writer.write(image, &target) {
            warn!("Skipping export of {}: {}", image.source.instance_uid, e);
        }
    }
}

fn output_report(report: &ReadReport, series_set: &SeriesSet, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!("{}", TextReport::new(report, series_set));
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize to JSON: {}", e);
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}
