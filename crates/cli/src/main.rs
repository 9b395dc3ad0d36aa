//! landheat CLI - Landsat surface energy and water balance indicators

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{ManifestSource, RunConfig};
use landheat_algorithms::imagery::{albedo, band_math, ndvi};
use landheat_algorithms::pipeline::run_with_source;
use landheat_algorithms::radiometry::ScaleFactors;
use landheat_algorithms::statistics::{zonal_summary, ZonalParams};
use landheat_algorithms::thermal::{emissivity_from_albedo, land_surface_temperature};
use landheat_core::io::{read_geotiff, write_geotiff, GeoTiffDirectorySink};
use landheat_core::{Band, BandStack, Raster, StudyRegion, CRS};
use landheat_parallel::{ProcessingMode, TiledProcessor};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landheat")]
#[command(author, version, about = "Land surface heat and water balance indicators from Landsat", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Run the full pipeline from a JSON run config
    Run {
        /// Run config (window, region, scene manifest, ET rasters, params)
        #[arg(short, long)]
        config: PathBuf,
        /// Override the config's output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// NDVI from NIR (SR_B5) and red (SR_B4) rasters
    Ndvi {
        nir: PathBuf,
        red: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Inputs are raw Collection-2 digital numbers; apply scale factors
        #[arg(long)]
        scale: bool,
    },
    /// Albedo proxy from the six reflective bands, blue to SWIR2
    Albedo {
        blue: PathBuf,
        green: PathBuf,
        red: PathBuf,
        nir: PathBuf,
        swir1: PathBuf,
        swir2: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Inputs are raw Collection-2 digital numbers; apply scale factors
        #[arg(long)]
        scale: bool,
    },
    /// Land surface temperature (°C) from brightness temperature and albedo
    Lst {
        /// Brightness temperature (ST_B10)
        thermal: PathBuf,
        /// Albedo proxy raster
        albedo: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Thermal input is raw Collection-2 digital numbers; apply scale factors
        #[arg(long)]
        scale: bool,
    },
    /// Zonal mean and standard deviation of a raster
    Stats {
        input: PathBuf,
        /// Region bounding box: min_x,min_y,max_x,max_y (default: raster extent)
        #[arg(long, value_delimiter = ',')]
        bounds: Option<Vec<f64>>,
        /// CRS of the bounds, `EPSG:<code>` (default: the raster's CRS)
        #[arg(long)]
        crs: Option<CRS>,
        /// Reduction scale in metres
        #[arg(long, default_value = "30.0")]
        scale: f64,
        /// Pixel budget
        #[arg(long, default_value = "10000000000")]
        max_pixels: u64,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default tracing subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

/// Read a reflective or thermal band, optionally applying its Collection-2 factors
fn read_band(path: &Path, band: Band, scale: bool, tiles: &TiledProcessor) -> Result<Raster<f64>> {
    let raster = read_raster(path)?;
    match ScaleFactors::for_group(band.group()) {
        Some(factors) if scale => band_math(&raster, |v| Some(factors.apply(v)), tiles)
            .with_context(|| format!("Failed to scale {}", band)),
        _ => Ok(raster),
    }
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn processing_mode(threads: Option<usize>) -> ProcessingMode {
    match threads {
        Some(n) => ProcessingMode::ParallelWith(n),
        None => ProcessingMode::default(),
    }
}

/// Load a run config, run the pipeline over its manifest and export the
/// five outputs. Returns the sink holding the written paths.
fn run_config(
    config: &Path,
    output_dir: Option<PathBuf>,
    threads: Option<usize>,
) -> Result<GeoTiffDirectorySink> {
    let run = RunConfig::load(config)?;
    let query = run.query()?;
    let mut params = run.params.clone();
    if threads.is_some() {
        params.processing = processing_mode(threads);
    }
    let output_dir = output_dir.unwrap_or_else(|| run.output_dir.clone());

    let source = ManifestSource::new(&run);
    let outputs = run_with_source(&source, &query, &params).context("Pipeline run failed")?;

    println!("Derived fields:");
    for field in outputs.fields() {
        println!("  {}: {} valid cells", field.name(), field.raster.valid_count());
    }
    println!("Zonal statistics:");
    for stat in outputs.statistics() {
        println!("  {}", stat);
    }
    let (min_x, min_y, max_x, max_y) = outputs.region_bounds();
    println!(
        "Region: ({:.6}, {:.6}) - ({:.6}, {:.6}) {}",
        min_x,
        min_y,
        max_x,
        max_y,
        query.region.crs()
    );

    let pb = spinner("Exporting...");
    let mut sink =
        GeoTiffDirectorySink::new(&output_dir).context("Failed to create output directory")?;
    outputs.export_all(&mut sink).context("Export failed")?;
    pb.finish_and_clear();
    Ok(sink)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mode = processing_mode(cli.threads);
    let tiles = TiledProcessor::new(landheat_parallel::DEFAULT_TILE_SIZE, mode)
        .context("Invalid --threads")?;

    match cli.command {
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Run { config, output_dir } => {
            let start = Instant::now();
            let sink = run_config(&config, output_dir, cli.threads)?;
            for path in sink.written() {
                println!("  {}", path.display());
            }
            let elapsed = start.elapsed();
            done(&format!("{} exports", sink.written().len()), sink.dir(), elapsed);
        }

        Commands::Ndvi {
            nir,
            red,
            output,
            scale,
        } => {
            let nir = read_band(&nir, Band::NIR, scale, &tiles)?;
            let red = read_band(&red, Band::RED, scale, &tiles)?;
            let start = Instant::now();
            let result = ndvi(&nir, &red, &tiles).context("NDVI failed")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("NDVI", &output, elapsed);
        }

        Commands::Albedo {
            blue,
            green,
            red,
            nir,
            swir1,
            swir2,
            output,
            scale,
        } => {
            let paths = [blue, green, red, nir, swir1, swir2];
            let bands = Band::OPTICAL
                .iter()
                .zip(paths.iter())
                .map(|(&band, path)| Ok((band, read_band(path, band, scale, &tiles)?)))
                .collect::<Result<Vec<_>>>()?;
            let stack = BandStack::from_bands(bands).context("Bands are not aligned")?;
            let start = Instant::now();
            let result = albedo(&stack, &tiles).context("Albedo failed")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Albedo", &output, elapsed);
        }

        Commands::Lst {
            thermal,
            albedo,
            output,
            scale,
        } => {
            let tb = read_band(&thermal, Band::THERMAL, scale, &tiles)?;
            let albedo = read_raster(&albedo)?;
            let start = Instant::now();
            let emissivity =
                emissivity_from_albedo(&albedo, &tiles).context("Emissivity failed")?;
            let result =
                land_surface_temperature(&tb, &emissivity, &tiles).context("LST failed")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("LST", &output, elapsed);
        }

        Commands::Stats {
            input,
            bounds,
            crs,
            scale,
            max_pixels,
        } => {
            let raster = read_raster(&input)?;
            let crs = crs.or_else(|| raster.crs().copied()).unwrap_or_default();
            let (min_x, min_y, max_x, max_y) = match bounds.as_deref() {
                Some(&[a, b, c, d]) => (a, b, c, d),
                Some(_) => anyhow::bail!("--bounds takes four values: min_x,min_y,max_x,max_y"),
                None => raster.bounds(),
            };
            let region = StudyRegion::from_bounds(min_x, min_y, max_x, max_y, crs)
                .context("Invalid region bounds")?;
            let params = ZonalParams { scale, max_pixels };

            let start = Instant::now();
            let summary =
                zonal_summary(&raster, &region, &params, &tiles).context("Zonal reduction failed")?;
            let elapsed = start.elapsed();

            println!("File: {}", input.display());
            println!("Scale: {} m, budget: {} pixels", summary.scale, summary.max_pixels);
            println!("  Count: {}", summary.count);
            println!("  Mean: {:.6}", summary.mean);
            println!("  Std dev: {:.6}", summary.std_dev);
            println!("  Processing time: {:.2?}", elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use landheat_core::GeoTransform;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_threads_select_mode() {
        assert_eq!(processing_mode(None), ProcessingMode::Parallel);
        assert_eq!(processing_mode(Some(3)), ProcessingMode::ParallelWith(3));
    }

    #[test]
    fn test_stats_bounds_parse() {
        let cli = Cli::try_parse_from([
            "landheat", "stats", "lst.tif", "--bounds", "0,0,300,300", "--scale", "90",
            "--crs", "EPSG:32719",
        ])
        .unwrap();
        match cli.command {
            Commands::Stats {
                bounds, scale, crs, ..
            } => {
                assert_eq!(bounds, Some(vec![0.0, 0.0, 300.0, 300.0]));
                assert_eq!(scale, 90.0);
                assert_eq!(crs, Some(CRS::from_epsg(32719)));
            }
            _ => panic!("expected stats"),
        }
        assert!(Cli::try_parse_from(["landheat", "stats", "lst.tif", "--crs", "UTM19S"]).is_err());
    }

    const CELL: f64 = 30.0;
    const SIZE: usize = 6;
    const ORIGIN: (f64, f64) = (350_000.0, 6_300_180.0);

    fn utm_grid(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut r = Raster::new(SIZE, SIZE);
        r.set_transform(GeoTransform::new(ORIGIN.0, ORIGIN.1, CELL, -CELL));
        r.set_crs(Some(CRS::from_epsg(32719)));
        for row in 0..SIZE {
            for col in 0..SIZE {
                r.set(row, col, f(row, col)).unwrap();
            }
        }
        r
    }

    /// Raw Collection-2 digital number for each band of a clear scene
    fn band_dn(band: Band, row: usize, col: usize) -> f64 {
        let optical = |r: f64| (r - ScaleFactors::OPTICAL.offset) / ScaleFactors::OPTICAL.gain;
        match band {
            Band::SrB2 => optical(0.05),
            Band::SrB3 => optical(0.08),
            Band::SrB4 => optical(0.15),
            Band::SrB5 => optical(0.35),
            Band::SrB6 => optical(0.25),
            Band::SrB7 => optical(0.15),
            Band::StB10 => {
                let kelvin = 295.0 + row as f64 + 0.5 * col as f64;
                (kelvin - ScaleFactors::THERMAL.offset) / ScaleFactors::THERMAL.gain
            }
            Band::QaPixel => 21824.0,
        }
    }

    #[test]
    fn test_run_config_exports_georeferenced_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let scene_dir = dir.path().join("LC08_233083_20240105");
        std::fs::create_dir_all(&scene_dir).unwrap();

        let mut bands = serde_json::Map::new();
        for band in Band::ALL {
            let path = scene_dir.join(format!("{}.tif", band));
            write_geotiff(&utm_grid(|r, c| band_dn(band, r, c)), &path).unwrap();
            bands.insert(band.to_string(), path.to_string_lossy().into_owned().into());
        }

        let mut et = Raster::filled(2, 2, 4.0);
        et.set_transform(GeoTransform::new(ORIGIN.0, ORIGIN.1, 90.0, -90.0));
        et.set_crs(Some(CRS::from_epsg(32719)));
        write_geotiff(&et, dir.path().join("et.tif")).unwrap();

        let (x0, y1) = ORIGIN;
        let (x1, y0) = (x0 + SIZE as f64 * CELL, y1 - SIZE as f64 * CELL);
        let config = serde_json::json!({
            "start_date": "2024-01-01",
            "end_date": "2024-02-01",
            "region": {
                "epsg": 32719,
                "exterior": [[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
            },
            "scenes": [
                {
                    "id": "LC08_233083_20240105",
                    "date": "2024-01-05",
                    "cloud_cover": 2.5,
                    "bands": bands
                },
                {
                    "id": "LC08_233083_20240121",
                    "date": "2024-01-21",
                    "cloud_cover": 64.0,
                    "bands": {"SR_B4": "missing.tif"}
                }
            ],
            "et": [{"date": "2024-01-01", "path": "et.tif"}],
            "output_dir": "out",
            "params": {"tile_size": 4}
        });
        let config_path = dir.path().join("run.json");
        std::fs::write(&config_path, config.to_string()).unwrap();

        let sink = run_config(&config_path, None, Some(2)).unwrap();
        assert_eq!(sink.dir(), dir.path().join("out"));

        let expected = GeoTransform::new(ORIGIN.0, ORIGIN.1, CELL, -CELL);
        let names = [
            "Land_Surface_Temperature",
            "Evapotranspiration_30m",
            "Solar_Radiation",
            "Urban_Heat_Island",
            "Urban_Thermal_Field_Variance_Index",
        ];
        assert_eq!(sink.written().len(), names.len());
        for name in names {
            let path = dir.path().join("out").join(format!("{}.tif", name));
            assert!(path.exists(), "{} was not exported", name);

            let back = read_raster(&path).unwrap();
            assert_eq!(back.shape(), (SIZE, SIZE));
            assert_eq!(back.transform(), &expected);
            assert_eq!(back.crs(), Some(&CRS::from_epsg(32719)));
            assert_eq!(back.valid_count(), SIZE * SIZE, "{} lost cells", name);
        }

        // Uniform NDVI equals its mean, so ET keeps the coarse value
        let et_back = read_raster(&dir.path().join("out/Evapotranspiration_30m.tif")).unwrap();
        assert_eq!(et_back.value(3, 3), Some(4.0));
    }
}
